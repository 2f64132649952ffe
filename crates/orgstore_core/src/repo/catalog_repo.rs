//! Repositories for the organization catalog and access entities.

use super::error::RepoResult;
use super::filter::Filter;
use super::repository::Repository;
use crate::model::{
    CatalogEntity, Department, Division, DivisionColumn, Level, Permission, Position, Role, Title,
};
use rusqlite::types::Value;

pub type DepartmentRepository<'c> = Repository<'c, Department>;
pub type DivisionRepository<'c> = Repository<'c, Division>;
pub type PositionRepository<'c> = Repository<'c, Position>;
pub type LevelRepository<'c> = Repository<'c, Level>;
pub type TitleRepository<'c> = Repository<'c, Title>;
pub type RoleRepository<'c> = Repository<'c, Role>;
pub type PermissionRepository<'c> = Repository<'c, Permission>;

impl<E: CatalogEntity> Repository<'_, E> {
    /// Finds the in-scope row whose code equals `code`, ignoring any
    /// configured cursor or limit.
    pub fn find_by_code(&self, code: &str) -> RepoResult<Option<E>> {
        self.find_first_where(Filter::Eq(E::CODE_COLUMN, Value::Text(code.to_string())))
    }
}

impl Repository<'_, Division> {
    /// Lists the in-scope divisions of one department.
    pub fn find_by_department(&self, department_id: i64) -> RepoResult<Vec<Division>> {
        self.with_filter(Filter::Eq(
            DivisionColumn::DepartmentId,
            Value::Integer(department_id),
        ))
        .find_all()
    }
}
