//! Generic service for coded, soft-deletable catalog entities.
//!
//! # Responsibility
//! - CRUD and bulk operations for departments, divisions, positions, levels
//!   and titles.
//! - Free unique codes on soft delete and regenerate them on restore.
//!
//! # Invariants
//! - A soft-deleted row carries a tombstone code, never its live code.
//! - A restored row gets `generated_code(id, name)` back.
//! - Updates return the row as re-read after the write.

use super::{ServiceError, ServiceResult};
use crate::db::Savepoint;
use crate::model::code::tombstone_code;
use crate::model::CatalogEntity;
use crate::repo::{
    now_epoch_ms, Entity, Filter, OrderBy, Patch, Predicate, Repository, SortDirection,
    DELETED_AT_COLUMN, ID_COLUMN,
};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// List parameters shared by every service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListFilter {
    /// Relation names to preload.
    pub preload: Vec<String>,
    /// Case-insensitive substring match on the name column.
    pub name: Option<String>,
    /// Column to sort by; defaults to `id`.
    pub sort: Option<String>,
    /// `asc` or `desc`; defaults to `asc`.
    pub order: Option<String>,
    pub limit: Option<u32>,
    /// Keyset cursor: only rows with `id > cursor`. Requires the default
    /// `id asc` ordering.
    pub cursor: Option<i64>,
    /// Lists only soft-deleted rows.
    pub show_deleted: bool,
}

impl ListFilter {
    /// Applies this filter to `repo`, matching names against `name_column`.
    ///
    /// # Errors
    /// - [`ServiceError::InvalidInput`] for an unknown sort column or order.
    /// - [`ServiceError::InvalidInput`] for a cursor combined with any
    ///   ordering other than `id asc`, since `id > cursor` pages would skip
    ///   rows under it.
    pub fn apply<'c, E: Entity>(
        &self,
        repo: &Repository<'c, E>,
        name_column: E::Column,
    ) -> ServiceResult<Repository<'c, E>> {
        let mut repo = repo.with_preloads(self.preload.iter().cloned());

        if let Some(name) = self.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            repo = repo.with_filter(Filter::Like(name_column, format!("%{name}%")));
        }
        if self.sort.is_some() || self.order.is_some() {
            let sort = self.sort.as_deref().unwrap_or("id");
            let order = self.order.as_deref().unwrap_or("asc");
            let order_by = OrderBy::parse::<E>(sort, order).ok_or_else(|| {
                ServiceError::InvalidInput(format!("cannot sort {} by `{sort} {order}`", E::TABLE))
            })?;
            repo = repo.with_order_by(order_by);
        }
        if let Some(limit) = self.limit {
            repo = repo.with_limit(limit);
        }
        if let Some(cursor) = self.cursor {
            if !self.orders_by_id_ascending() {
                return Err(ServiceError::InvalidInput(format!(
                    "cursor paging of {} requires `id asc` ordering",
                    E::TABLE
                )));
            }
            repo = repo.with_cursor(cursor);
        }
        if self.show_deleted && E::SOFT_DELETE {
            repo = repo.with_unscoped().with_predicate(Predicate::raw(
                format!("{}.{DELETED_AT_COLUMN} IS NOT NULL", E::TABLE),
                [],
            ));
        }
        Ok(repo)
    }

    fn orders_by_id_ascending(&self) -> bool {
        let sort = self.sort.as_deref().map_or(ID_COLUMN, str::trim);
        let order = self.order.as_deref().unwrap_or("asc");
        sort == ID_COLUMN && SortDirection::parse(order) == Some(SortDirection::Asc)
    }
}

/// Service for one catalog entity type.
pub struct CatalogService<'c, E: CatalogEntity> {
    repo: Repository<'c, E>,
}

impl<'c, E: CatalogEntity> CatalogService<'c, E> {
    pub fn new(conn: &'c Connection) -> Self {
        Self::from_repository(Repository::new(conn))
    }

    pub fn from_repository(repo: Repository<'c, E>) -> Self {
        Self { repo }
    }

    /// Returns a service bound to unit of work `tx`.
    pub fn with_tx<'t>(&self, tx: &'t Connection) -> CatalogService<'t, E> {
        CatalogService::from_repository(self.repo.with_tx(tx))
    }

    pub fn repository(&self) -> &Repository<'c, E> {
        &self.repo
    }

    pub fn create(&self, entity: E) -> ServiceResult<E> {
        Ok(self.repo.insert(entity)?)
    }

    pub fn create_many(&self, entities: Vec<E>) -> ServiceResult<Vec<E>> {
        Ok(self.repo.insert_many(entities)?)
    }

    /// Returns one active row with `preloads` attached.
    pub fn get(&self, id: i64, preloads: &[&str]) -> ServiceResult<E> {
        Ok(self
            .repo
            .with_preloads(preloads.iter().copied())
            .find_by_id(id)?)
    }

    pub fn get_many(&self, ids: &[i64]) -> ServiceResult<Vec<E>> {
        Ok(self.repo.find_by_ids(ids)?)
    }

    pub fn list(&self, filter: &ListFilter) -> ServiceResult<Vec<E>> {
        Ok(filter.apply(&self.repo, E::NAME_COLUMN)?.find_all()?)
    }

    /// Applies `patch` to row `id` and returns the re-read row.
    ///
    /// Setting `deleted_at` to `NULL` restores the row and regenerates its
    /// code. Any patch touching `deleted_at` can target soft-deleted rows.
    pub fn update(&self, id: i64, patch: Patch<E::Column>) -> ServiceResult<E> {
        if restores::<E>(&patch) {
            let savepoint = Savepoint::begin(self.repo.conn(), "orgstore_restore_update")?;
            self.restore_row(id)?;
            let rest = patch.without(E::DELETED_AT_COLUMN);
            if !rest.is_empty() {
                self.repo.update_by_id(id, &rest)?;
            }
            savepoint.release()?;
            return Ok(self.repo.find_by_id(id)?);
        }

        let repo = if patch.touches(E::DELETED_AT_COLUMN) {
            self.repo.with_unscoped()
        } else {
            self.repo.clone()
        };
        repo.update_by_id(id, &patch)?;
        Ok(repo.find_by_id(id)?)
    }

    /// Applies `patch` to every row among `ids`; returns the rows changed.
    pub fn update_many(&self, ids: &[i64], patch: Patch<E::Column>) -> ServiceResult<usize> {
        if restores::<E>(&patch) {
            let savepoint = Savepoint::begin(self.repo.conn(), "orgstore_restore_update")?;
            let mut changed = self.restore_many(ids)?;
            let rest = patch.without(E::DELETED_AT_COLUMN);
            if !rest.is_empty() {
                changed = self.repo.update_many(ids, &rest)?;
            }
            savepoint.release()?;
            return Ok(changed);
        }

        if patch.touches(E::DELETED_AT_COLUMN) {
            Ok(self.repo.with_unscoped().update_many(ids, &patch)?)
        } else {
            Ok(self.repo.update_many(ids, &patch)?)
        }
    }

    /// Soft-deletes row `id` behind a tombstone code, or purges it when
    /// `permanent` is set.
    pub fn delete(&self, id: i64, permanent: bool) -> ServiceResult<()> {
        if permanent {
            self.repo.with_unscoped().remove_by_id(id)?;
            return Ok(());
        }

        let savepoint = Savepoint::begin(self.repo.conn(), "orgstore_soft_delete")?;
        self.bury(id)?;
        self.repo.remove_by_id(id)?;
        savepoint.release()?;
        Ok(())
    }

    /// Bulk form of [`CatalogService::delete`]; returns the rows affected.
    pub fn delete_many(&self, ids: &[i64], permanent: bool) -> ServiceResult<usize> {
        if ids.is_empty() {
            return Err(ServiceError::InvalidInput(format!(
                "no {} ids to delete",
                E::TABLE
            )));
        }
        if permanent {
            return Ok(self.repo.with_unscoped().remove_many(ids)?);
        }

        let savepoint = Savepoint::begin(self.repo.conn(), "orgstore_soft_delete")?;
        for row in self.repo.find_by_ids(ids)? {
            self.bury(row.id())?;
        }
        let changed = self.repo.remove_many(ids)?;
        savepoint.release()?;
        Ok(changed)
    }

    /// Clears `deleted_at` on row `id` and regenerates its code.
    ///
    /// Restoring an active row returns it unchanged.
    pub fn restore(&self, id: i64) -> ServiceResult<E> {
        self.restore_row(id)?;
        Ok(self.repo.find_by_id(id)?)
    }

    /// Restores every soft-deleted row among `ids`; returns the count.
    pub fn restore_many(&self, ids: &[i64]) -> ServiceResult<usize> {
        if ids.is_empty() {
            return Err(ServiceError::InvalidInput(format!(
                "no {} ids to restore",
                E::TABLE
            )));
        }

        let deleted = self
            .repo
            .with_unscoped()
            .with_filter(Filter::IsNotNull(E::DELETED_AT_COLUMN))
            .find_by_ids(ids)?;

        let savepoint = Savepoint::begin(self.repo.conn(), "orgstore_restore")?;
        for row in &deleted {
            self.repo
                .with_unscoped()
                .update_by_id(row.id(), &restore_patch(row))?;
        }
        savepoint.release()?;
        Ok(deleted.len())
    }

    fn restore_row(&self, id: i64) -> ServiceResult<E> {
        let unscoped = self.repo.with_unscoped();
        let row = unscoped.find_by_id(id)?;
        if row.deleted_at().is_none() {
            return Ok(row);
        }
        unscoped.update_by_id(id, &restore_patch(&row))?;
        Ok(row)
    }

    /// Replaces the live code of active row `id` with a tombstone.
    fn bury(&self, id: i64) -> ServiceResult<()> {
        let code = tombstone_code(E::TABLE, id, now_epoch_ms() / 1_000);
        self.repo
            .update_by_id(id, &Patch::new().set(E::CODE_COLUMN, code))?;
        Ok(())
    }
}

fn restores<E: CatalogEntity>(patch: &Patch<E::Column>) -> bool {
    matches!(patch.get(E::DELETED_AT_COLUMN), Some(Value::Null))
}

fn restore_patch<E: CatalogEntity>(row: &E) -> Patch<E::Column> {
    Patch::new()
        .set_null(E::DELETED_AT_COLUMN)
        .set(E::CODE_COLUMN, E::generated_code(row.id(), row.name()))
}
