//! Level entity. Owns titles.

use super::code::id_code;
use super::CatalogEntity;
use super::title::Title;
use crate::repo::{record_ids, relations_of, Column, Entity, Preloaded, Record, Relation};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Relation name for the titles at a level.
pub const TITLES: &str = "titles";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_ids: Option<Vec<i64>>,
    /// Related records, keyed by preloaded relation name.
    #[serde(default, skip_serializing_if = "Preloaded::is_empty")]
    pub preloaded: Preloaded,
}

impl Level {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelColumn {
    Id,
    Name,
    Code,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl Column for LevelColumn {
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

impl Entity for Level {
    type Column = LevelColumn;

    const TABLE: &'static str = "levels";
    const SEQUENCE: &'static str = "levels_seq";
    const SOFT_DELETE: bool = true;
    const RELATIONS: &'static [Relation] =
        &[Relation::has_many(TITLES, "titles", "level_id", true).nested(relations_of::<Title>)];

    fn id(&self) -> i64 {
        self.id
    }

    fn before_insert(&mut self, id: i64, now_ms: i64) {
        self.id = id;
        self.created_at = now_ms;
        self.updated_at = now_ms;
        if self.code.as_deref().map_or(true, str::is_empty) {
            self.code = Some(id_code(id));
        }
    }

    fn insert_values(&self) -> Vec<(Self::Column, Value)> {
        vec![
            (LevelColumn::Id, Value::Integer(self.id)),
            (LevelColumn::Name, Value::Text(self.name.clone())),
            (LevelColumn::Code, self.code.clone().into()),
            (LevelColumn::CreatedAt, Value::Integer(self.created_at)),
            (LevelColumn::UpdatedAt, Value::Integer(self.updated_at)),
            (LevelColumn::DeletedAt, self.deleted_at.into()),
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

impl CatalogEntity for Level {
    const NAME_COLUMN: Self::Column = LevelColumn::Name;
    const CODE_COLUMN: Self::Column = LevelColumn::Code;
    const DELETED_AT_COLUMN: Self::Column = LevelColumn::DeletedAt;

    fn name(&self) -> &str {
        &self.name
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    fn generated_code(id: i64, _name: &str) -> String {
        id_code(id)
    }
}
