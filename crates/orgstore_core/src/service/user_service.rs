//! User use-case service.
//!
//! # Responsibility
//! - Hash passwords before they reach the store.
//! - Keep role links in step with user writes.
//! - Share soft delete, tombstone and restore rules with catalog entities.
//!
//! # Invariants
//! - Plaintext passwords never reach SQL or logs.
//! - A role set given with a write replaces the user's roles completely.

use super::catalog_service::{CatalogService, ListFilter};
use super::password::{hash_password, verify_password};
use super::{ServiceError, ServiceResult};
use crate::db::Savepoint;
use crate::model::user::ROLES;
use crate::model::{User, UserColumn};
use crate::repo::{Patch, Repository};
use log::info;
use rusqlite::types::Value;
use rusqlite::Connection;

/// Partial user update.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// Column assignments. A `password` value is plaintext and gets hashed.
    pub patch: Patch<UserColumn>,
    /// Complete new role set; `None` leaves roles untouched.
    pub roles: Option<Vec<i64>>,
}

impl UserUpdate {
    pub fn patch(patch: Patch<UserColumn>) -> Self {
        Self { patch, roles: None }
    }

    pub fn with_roles(mut self, roles: Vec<i64>) -> Self {
        self.roles = Some(roles);
        self
    }
}

pub struct UserService<'c> {
    users: CatalogService<'c, User>,
}

impl<'c> UserService<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            users: CatalogService::new(conn),
        }
    }

    /// Returns a service bound to unit of work `tx`.
    pub fn with_tx<'t>(&self, tx: &'t Connection) -> UserService<'t> {
        UserService {
            users: self.users.with_tx(tx),
        }
    }

    pub fn repository(&self) -> &Repository<'c, User> {
        self.users.repository()
    }

    /// Creates one user with a hashed password and optional roles.
    pub fn create(&self, user: User) -> ServiceResult<User> {
        let created = self.create_many(vec![user])?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::InvalidInput("no user created".to_string()))
    }

    /// Creates all users or none.
    ///
    /// # Errors
    /// - [`ServiceError::InvalidInput`] naming the index of the first user
    ///   without a password.
    pub fn create_many(&self, mut users: Vec<User>) -> ServiceResult<Vec<User>> {
        for (index, user) in users.iter_mut().enumerate() {
            if user.password.is_empty() {
                return Err(ServiceError::InvalidInput(format!(
                    "password for user at index {index} must not be empty"
                )));
            }
            user.password = hash_password(&user.password)?;
        }
        let roles: Vec<Option<Vec<i64>>> = users.iter().map(|user| user.role_ids.clone()).collect();

        let repo = self.repository();
        let savepoint = Savepoint::begin(repo.conn(), "orgstore_user_create")?;
        let mut created = repo.insert_many(users)?;
        for (user, roles) in created.iter_mut().zip(roles) {
            if let Some(roles) = roles {
                repo.replace_association(user.id, ROLES, &roles)?;
                user.role_ids = Some(roles);
            }
        }
        savepoint.release()?;

        info!(
            "event=user_create module=service status=ok count={}",
            created.len()
        );
        Ok(created)
    }

    pub fn get(&self, id: i64, preloads: &[&str]) -> ServiceResult<User> {
        self.users.get(id, preloads)
    }

    pub fn get_many(&self, ids: &[i64]) -> ServiceResult<Vec<User>> {
        self.users.get_many(ids)
    }

    pub fn list(&self, filter: &ListFilter) -> ServiceResult<Vec<User>> {
        self.users.list(filter)
    }

    pub fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.repository().find_by_email(email)?)
    }

    /// Applies `update` to user `id` and returns the re-read user.
    ///
    /// With a role set, the roles are preloaded in the returned user.
    pub fn update(&self, id: i64, update: UserUpdate) -> ServiceResult<User> {
        let patch = hash_patch(update.patch)?;
        let Some(roles) = update.roles else {
            return self.users.update(id, patch);
        };

        let repo = self.repository();
        let savepoint = Savepoint::begin(repo.conn(), "orgstore_user_update")?;
        let touches_deleted_at = patch.touches(UserColumn::DeletedAt);
        if !patch.is_empty() {
            self.users.update(id, patch)?;
        }
        let scoped = if touches_deleted_at {
            repo.with_unscoped()
        } else {
            repo.clone()
        };
        scoped
            .with_associations([ROLES])
            .with_replacement(ROLES, roles)
            .update_by_id(id, &Patch::new())?;
        savepoint.release()?;

        Ok(scoped.with_preloads([ROLES]).find_by_id(id)?)
    }

    /// Applies `update` to every user among `ids`; returns the rows changed.
    ///
    /// With a role set, each user is updated and re-associated in turn
    /// inside one savepoint, so either every user changes or none does.
    pub fn update_many(&self, ids: &[i64], update: UserUpdate) -> ServiceResult<usize> {
        let mut patch = hash_patch(update.patch)?;
        let Some(roles) = update.roles else {
            return self.users.update_many(ids, patch);
        };
        if ids.is_empty() {
            return Err(ServiceError::InvalidInput("no user ids to update".to_string()));
        }

        let repo = self.repository();
        let savepoint = Savepoint::begin(repo.conn(), "orgstore_user_update_many")?;
        let mut scoped = repo.with_associations([ROLES]).with_replacement(ROLES, roles);
        if patch.touches(UserColumn::DeletedAt) {
            if matches!(patch.get(UserColumn::DeletedAt), Some(Value::Null)) {
                self.users.restore_many(ids)?;
                patch = patch.without(UserColumn::DeletedAt);
            }
            scoped = scoped.with_unscoped();
        }
        let changed = scoped.update_many(ids, &patch)?;
        savepoint.release()?;
        Ok(changed)
    }

    /// Replaces the password of user `id` after verifying `old_password`.
    ///
    /// # Errors
    /// - [`ServiceError::InvalidCredentials`] when `old_password` is wrong.
    pub fn change_password(
        &self,
        id: i64,
        old_password: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let user = self.repository().find_by_id(id)?;
        if !verify_password(old_password, &user.password)? {
            return Err(ServiceError::InvalidCredentials);
        }

        let patch = Patch::new()
            .set(UserColumn::Password, hash_password(new_password)?)
            .set(UserColumn::IsPasswordDefault, false);
        self.repository().update_by_id(id, &patch)?;
        info!("event=password_change module=service status=ok user_id={id}");
        Ok(())
    }

    /// Returns the active user matching `email` and `password`.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let Some(user) = self.find_by_email(email)? else {
            return Err(ServiceError::InvalidCredentials);
        };
        if !verify_password(password, &user.password)? {
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(user)
    }

    pub fn delete(&self, id: i64, permanent: bool) -> ServiceResult<()> {
        self.users.delete(id, permanent)
    }

    pub fn delete_many(&self, ids: &[i64], permanent: bool) -> ServiceResult<usize> {
        self.users.delete_many(ids, permanent)
    }

    pub fn restore(&self, id: i64) -> ServiceResult<User> {
        self.users.restore(id)
    }

    pub fn restore_many(&self, ids: &[i64]) -> ServiceResult<usize> {
        self.users.restore_many(ids)
    }
}

/// Replaces a plaintext `password` assignment with its hash.
fn hash_patch(patch: Patch<UserColumn>) -> ServiceResult<Patch<UserColumn>> {
    let hashed = match patch.get(UserColumn::Password) {
        Some(Value::Text(plain)) => hash_password(plain)?,
        Some(_) => {
            return Err(ServiceError::InvalidInput(
                "password must be text".to_string(),
            ))
        }
        None => return Ok(patch),
    };
    Ok(patch.set(UserColumn::Password, hashed))
}
