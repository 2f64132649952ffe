//! Permission entity.

use super::role::Role;
use crate::repo::{record_ids, relations_of, Column, Entity, Preloaded, Record, Relation};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Relation name for the roles granting a permission.
pub const ROLES: &str = "roles";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<i64>>,
    /// Related records, keyed by preloaded relation name.
    #[serde(default, skip_serializing_if = "Preloaded::is_empty")]
    pub preloaded: Preloaded,
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionColumn {
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl Column for PermissionColumn {
    const ALL: &'static [Self] = &[Self::Id, Self::Name, Self::CreatedAt, Self::UpdatedAt];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl Entity for Permission {
    type Column = PermissionColumn;

    const TABLE: &'static str = "permissions";
    const SEQUENCE: &'static str = "permissions_seq";
    const RELATIONS: &'static [Relation] = &[Relation::many_to_many(
        ROLES,
        "role_has_permissions",
        "permission_id",
        "role_id",
        "roles",
        false,
    )
    .nested(relations_of::<Role>)];

    fn id(&self) -> i64 {
        self.id
    }

    fn before_insert(&mut self, id: i64, now_ms: i64) {
        self.id = id;
        self.created_at = now_ms;
        self.updated_at = now_ms;
    }

    fn insert_values(&self) -> Vec<(Self::Column, Value)> {
        vec![
            (PermissionColumn::Id, Value::Integer(self.id)),
            (PermissionColumn::Name, Value::Text(self.name.clone())),
            (PermissionColumn::CreatedAt, Value::Integer(self.created_at)),
            (PermissionColumn::UpdatedAt, Value::Integer(self.updated_at)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            role_ids: None,
            preloaded: Preloaded::new(),
        })
    }

    fn attach_related(&mut self, relation: &str, records: Vec<Record>) {
        if relation == ROLES {
            self.role_ids = Some(record_ids(&records));
        }
        self.preloaded.insert(relation.to_string(), records);
    }
}
