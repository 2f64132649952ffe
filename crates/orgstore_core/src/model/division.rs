//! Division entity. Belongs to a department and owns positions.

use super::code::name_code;
use super::CatalogEntity;
use super::position::Position;
use crate::repo::{record_ids, relations_of, Column, Entity, Preloaded, Record, Relation};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Relation name for the positions of a division.
pub const POSITIONS: &str = "positions";
/// Relation name for the department a division belongs to.
pub const DEPARTMENT: &str = "department";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub department_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    /// Filled only when `positions` is preloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_ids: Option<Vec<i64>>,
    /// Related records, keyed by preloaded relation name.
    #[serde(default, skip_serializing_if = "Preloaded::is_empty")]
    pub preloaded: Preloaded,
}

impl Division {
    pub fn new(name: impl Into<String>, department_id: i64) -> Self {
        Self {
            name: name.into(),
            department_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivisionColumn {
    Id,
    Name,
    Code,
    DepartmentId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl Column for DivisionColumn {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Name,
        Self::Code,
        Self::DepartmentId,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::DeletedAt,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Code => "code",
            Self::DepartmentId => "department_id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
        }
    }
}

impl Entity for Division {
    type Column = DivisionColumn;

    const TABLE: &'static str = "divisions";
    const SEQUENCE: &'static str = "divisions_seq";
    const SOFT_DELETE: bool = true;
    const RELATIONS: &'static [Relation] = &[
        Relation::has_many(POSITIONS, "positions", "division_id", true)
            .nested(relations_of::<Position>),
        Relation::belongs_to(DEPARTMENT, "departments", "department_id", true),
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn before_insert(&mut self, id: i64, now_ms: i64) {
        self.id = id;
        self.created_at = now_ms;
        self.updated_at = now_ms;
        if self.code.is_empty() {
            self.code = name_code(&self.name, id);
        }
    }

    fn insert_values(&self) -> Vec<(Self::Column, Value)> {
        vec![
            (DivisionColumn::Id, Value::Integer(self.id)),
            (DivisionColumn::Name, Value::Text(self.name.clone())),
            (DivisionColumn::Code, Value::Text(self.code.clone())),
            (DivisionColumn::DepartmentId, Value::Integer(self.department_id)),
            (DivisionColumn::CreatedAt, Value::Integer(self.created_at)),
            (DivisionColumn::UpdatedAt, Value::Integer(self.updated_at)),
            (DivisionColumn::DeletedAt, self.deleted_at.into()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            code: row.get("code")?,
            department_id: row.get("department_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
            position_ids: None,
            preloaded: Preloaded::new(),
        })
    }

    fn attach_related(&mut self, relation: &str, records: Vec<Record>) {
        if relation == POSITIONS {
            self.position_ids = Some(record_ids(&records));
        }
        self.preloaded.insert(relation.to_string(), records);
    }
}

impl CatalogEntity for Division {
    const NAME_COLUMN: Self::Column = DivisionColumn::Name;
    const CODE_COLUMN: Self::Column = DivisionColumn::Code;
    const DELETED_AT_COLUMN: Self::Column = DivisionColumn::DeletedAt;

    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> Option<&str> {
        Some(&self.code)
    }

    fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    fn generated_code(id: i64, name: &str) -> String {
        name_code(name, id)
    }
}
