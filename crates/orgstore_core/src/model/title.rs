//! Title entity. Optionally tied to a position and a level.

use super::code::name_code;
use super::CatalogEntity;
use super::level::Level;
use super::position::Position;
use crate::repo::{relations_of, Column, Entity, Preloaded, Record, Relation};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Relation name for the position a title belongs to.
pub const POSITION: &str = "position";
/// Relation name for the level a title belongs to.
pub const LEVEL: &str = "level";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub color: String,
    pub position_id: Option<i64>,
    pub level_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    /// Related records, keyed by preloaded relation name.
    #[serde(default, skip_serializing_if = "Preloaded::is_empty")]
    pub preloaded: Preloaded,
}

impl Title {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleColumn {
    Id,
    Name,
    Code,
    Color,
    PositionId,
    LevelId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl Column for TitleColumn {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Name,
        Self::Code,
        Self::Color,
        Self::PositionId,
        Self::LevelId,
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
            Self::PositionId => "position_id",
            Self::LevelId => "level_id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
        }
    }
}

impl Entity for Title {
    type Column = TitleColumn;

    const TABLE: &'static str = "titles";
    const SEQUENCE: &'static str = "titles_seq";
    const SOFT_DELETE: bool = true;
    const RELATIONS: &'static [Relation] = &[
        Relation::belongs_to(POSITION, "positions", "position_id", true)
            .nested(relations_of::<Position>),
        Relation::belongs_to(LEVEL, "levels", "level_id", true).nested(relations_of::<Level>),
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
            (TitleColumn::Id, Value::Integer(self.id)),
            (TitleColumn::Name, Value::Text(self.name.clone())),
            (TitleColumn::Code, Value::Text(self.code.clone())),
            (TitleColumn::Color, Value::Text(self.color.clone())),
            (TitleColumn::PositionId, self.position_id.into()),
            (TitleColumn::LevelId, self.level_id.into()),
            (TitleColumn::CreatedAt, Value::Integer(self.created_at)),
            (TitleColumn::UpdatedAt, Value::Integer(self.updated_at)),
            (TitleColumn::DeletedAt, self.deleted_at.into()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            code: row.get("code")?,
            color: row.get("color")?,
            position_id: row.get("position_id")?,
            level_id: row.get("level_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
            preloaded: Preloaded::new(),
        })
    }

    fn attach_related(&mut self, relation: &str, records: Vec<Record>) {
        self.preloaded.insert(relation.to_string(), records);
    }
}

impl CatalogEntity for Title {
    const NAME_COLUMN: Self::Column = TitleColumn::Name;
    const CODE_COLUMN: Self::Column = TitleColumn::Code;
    const DELETED_AT_COLUMN: Self::Column = TitleColumn::DeletedAt;

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
