//! Department entity.

use super::code::name_code;
use super::CatalogEntity;
use crate::repo::{Column, Entity};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Department {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartmentColumn {
    Id,
    Name,
    Code,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl Column for DepartmentColumn {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Name,
        Self::Code,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::DeletedAt,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Code => "code",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
        }
    }
}

impl Entity for Department {
    type Column = DepartmentColumn;

    const TABLE: &'static str = "departments";
    const SEQUENCE: &'static str = "departments_seq";
    const SOFT_DELETE: bool = true;

    fn id(&self) -> i64 {
        self.id
    }

    fn before_insert(&mut self, id: i64, now_ms: i64) {
        self.id = id;
        self.created_at = now_ms;
        self.updated_at = now_ms;
        if self.code.as_deref().map_or(true, str::is_empty) {
            self.code = Some(name_code(&self.name, id));
        }
    }

    fn insert_values(&self) -> Vec<(Self::Column, Value)> {
        vec![
            (DepartmentColumn::Id, Value::Integer(self.id)),
            (DepartmentColumn::Name, Value::Text(self.name.clone())),
            (DepartmentColumn::Code, self.code.clone().into()),
            (DepartmentColumn::CreatedAt, Value::Integer(self.created_at)),
            (DepartmentColumn::UpdatedAt, Value::Integer(self.updated_at)),
            (DepartmentColumn::DeletedAt, self.deleted_at.into()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            code: row.get("code")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
        })
    }
}

impl CatalogEntity for Department {
    const NAME_COLUMN: Self::Column = DepartmentColumn::Name;
    const CODE_COLUMN: Self::Column = DepartmentColumn::Code;
    const DELETED_AT_COLUMN: Self::Column = DepartmentColumn::DeletedAt;

    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    fn generated_code(id: i64, name: &str) -> String {
        name_code(name, id)
    }
}
