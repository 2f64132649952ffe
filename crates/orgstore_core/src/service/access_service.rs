//! Roles and permissions.
//!
//! # Responsibility
//! - CRUD for roles and permissions.
//! - Replace role-permission and user-role links as complete sets.
//!
//! # Invariants
//! - Roles and permissions are purged on delete; their links go first.

use super::catalog_service::ListFilter;
use super::ServiceResult;
use crate::db::Savepoint;
use crate::model::permission::ROLES;
use crate::model::role::{PERMISSIONS, USERS};
use crate::model::{Permission, PermissionColumn, Role, RoleColumn};
use crate::repo::{Patch, Repository};
use rusqlite::Connection;

pub struct AccessService<'c> {
    roles: Repository<'c, Role>,
    permissions: Repository<'c, Permission>,
}

impl<'c> AccessService<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            roles: Repository::new(conn),
            permissions: Repository::new(conn),
        }
    }

    /// Returns a service bound to unit of work `tx`.
    pub fn with_tx<'t>(&self, tx: &'t Connection) -> AccessService<'t> {
        AccessService {
            roles: self.roles.with_tx(tx),
            permissions: self.permissions.with_tx(tx),
        }
    }

    /// Creates a role and links the permission and user ids it carries.
    pub fn create_role(&self, role: Role) -> ServiceResult<Role> {
        let permissions = role.permission_ids.clone();
        let users = role.user_ids.clone();

        let savepoint = Savepoint::begin(self.roles.conn(), "orgstore_role_create")?;
        let created = self.roles.insert(role)?;
        if let Some(ids) = &permissions {
            self.roles.replace_association(created.id, PERMISSIONS, ids)?;
        }
        if let Some(ids) = &users {
            self.roles.replace_association(created.id, USERS, ids)?;
        }
        savepoint.release()?;
        Ok(created)
    }

    /// Updates role `id`; `Some` link sets replace the current links.
    ///
    /// Returns the re-read role with replaced relations preloaded.
    pub fn update_role(
        &self,
        id: i64,
        patch: Patch<RoleColumn>,
        permissions: Option<Vec<i64>>,
        users: Option<Vec<i64>>,
    ) -> ServiceResult<Role> {
        let mut repo = self.roles.clone();
        let mut replaced = Vec::new();
        if let Some(ids) = permissions {
            repo = repo.with_replacement(PERMISSIONS, ids);
            replaced.push(PERMISSIONS);
        }
        if let Some(ids) = users {
            repo = repo.with_replacement(USERS, ids);
            replaced.push(USERS);
        }

        repo.with_associations(replaced.iter().copied())
            .update_by_id(id, &patch)?;
        Ok(self.roles.with_preloads(replaced).find_by_id(id)?)
    }

    /// Deletes role `id` after clearing its permission and user links.
    pub fn delete_role(&self, id: i64) -> ServiceResult<()> {
        self.roles
            .with_associations([PERMISSIONS, USERS])
            .remove_by_id(id)?;
        Ok(())
    }

    pub fn get_role(&self, id: i64, preloads: &[&str]) -> ServiceResult<Role> {
        Ok(self
            .roles
            .with_preloads(preloads.iter().copied())
            .find_by_id(id)?)
    }

    pub fn list_roles(&self, filter: &ListFilter) -> ServiceResult<Vec<Role>> {
        Ok(filter.apply(&self.roles, RoleColumn::Name)?.find_all()?)
    }

    /// Creates a permission and links the role ids it carries.
    pub fn create_permission(&self, permission: Permission) -> ServiceResult<Permission> {
        let roles = permission.role_ids.clone();

        let savepoint = Savepoint::begin(self.permissions.conn(), "orgstore_permission_create")?;
        let created = self.permissions.insert(permission)?;
        if let Some(ids) = &roles {
            self.permissions
                .replace_association(created.id, ROLES, ids)?;
        }
        savepoint.release()?;
        Ok(created)
    }

    /// Updates permission `id`; `Some(roles)` replaces its role links.
    pub fn update_permission(
        &self,
        id: i64,
        patch: Patch<PermissionColumn>,
        roles: Option<Vec<i64>>,
    ) -> ServiceResult<Permission> {
        let repo = match roles {
            Some(ids) => self
                .permissions
                .with_associations([ROLES])
                .with_replacement(ROLES, ids),
            None => self.permissions.clone(),
        };
        repo.update_by_id(id, &patch)?;
        Ok(self.permissions.find_by_id(id)?)
    }

    pub fn delete_permission(&self, id: i64) -> ServiceResult<()> {
        self.permissions
            .with_associations([ROLES])
            .remove_by_id(id)?;
        Ok(())
    }

    pub fn get_permission(&self, id: i64, preloads: &[&str]) -> ServiceResult<Permission> {
        Ok(self
            .permissions
            .with_preloads(preloads.iter().copied())
            .find_by_id(id)?)
    }

    pub fn list_permissions(&self, filter: &ListFilter) -> ServiceResult<Vec<Permission>> {
        Ok(filter
            .apply(&self.permissions, PermissionColumn::Name)?
            .find_all()?)
    }
}
