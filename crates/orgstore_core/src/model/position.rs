//! Position entity. Optionally belongs to a division and owns titles.

use super::code::id_code;
use super::CatalogEntity;
use super::division::Division;
use super::title::Title;
use crate::repo::{record_ids, relations_of, Column, Entity, Preloaded, Record, Relation};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Relation name for the titles of a position.
pub const TITLES: &str = "titles";
/// Relation name for the division a position belongs to.
pub const DIVISION: &str = "division";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub color: String,
    pub division_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    /// Filled only when `titles` is preloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_ids: Option<Vec<i64>>,
    /// Related records, keyed by preloaded relation name.
    #[serde(default, skip_serializing_if = "Preloaded::is_empty")]
    pub preloaded: Preloaded,
}

impl Position {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionColumn {
    Id,
    Name,
    Code,
    Color,
    DivisionId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl Column for PositionColumn {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Name,
        Self::Code,
        Self::Color,
        Self::DivisionId,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::DeletedAt,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Code => "code",
            Self::Color => "color",
            Self::DivisionId => "division_id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
        }
    }
}

impl Entity for Position {
    type Column = PositionColumn;

    const TABLE: &'static str = "positions";
    const SEQUENCE: &'static str = "positions_seq";
    const SOFT_DELETE: bool = true;
    const RELATIONS: &'static [Relation] = &[
        Relation::has_many(TITLES, "titles", "position_id", true).nested(relations_of::<Title>),
        Relation::belongs_to(DIVISION, "divisions", "division_id", true)
            .nested(relations_of::<Division>),
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn before_insert(&mut self, id: i64, now_ms: i64) {
        self.id = id;
        self.created_at = now_ms;
        self.updated_at = now_ms;
        if self.code.is_empty() {
            self.code = id_code(id);
        }
    }

    fn insert_values(&self) -> Vec<(Self::Column, Value)> {
        vec![
            (PositionColumn::Id, Value::Integer(self.id)),
            (PositionColumn::Name, Value::Text(self.name.clone())),
            (PositionColumn::Code, Value::Text(self.code.clone())),
            (PositionColumn::Color, Value::Text(self.color.clone())),
            (PositionColumn::DivisionId, self.division_id.into()),
            (PositionColumn::CreatedAt, Value::Integer(self.created_at)),
            (PositionColumn::UpdatedAt, Value::Integer(self.updated_at)),
            (PositionColumn::DeletedAt, self.deleted_at.into()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            code: row.get("code")?,
            color: row.get("color")?,
            division_id: row.get("division_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
            title_ids: None,
            preloaded: Preloaded::new(),
        })
    }

    fn attach_related(&mut self, relation: &str, records: Vec<Record>) {
        if relation == TITLES {
            self.title_ids = Some(record_ids(&records));
        }
        self.preloaded.insert(relation.to_string(), records);
    }
}

impl CatalogEntity for Position {
    const NAME_COLUMN: Self::Column = PositionColumn::Name;
    const CODE_COLUMN: Self::Column = PositionColumn::Code;
    const DELETED_AT_COLUMN: Self::Column = PositionColumn::DeletedAt;

    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> Option<&str> {
        Some(&self.code)
    }

    fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    fn generated_code(id: i64, _name: &str) -> String {
        id_code(id)
    }
}
