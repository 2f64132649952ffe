//! Role entity. Links permissions and users through join tables.

use super::permission::Permission;
use super::user::User;
use crate::repo::{record_ids, relations_of, Column, Entity, Preloaded, Record, Relation};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Relation name for the permissions granted by a role.
pub const PERMISSIONS: &str = "permissions";
/// Relation name for the users holding a role.
pub const USERS: &str = "users";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<i64>>,
    /// Related records, keyed by preloaded relation name.
    #[serde(default, skip_serializing_if = "Preloaded::is_empty")]
    pub preloaded: Preloaded,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleColumn {
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl Column for RoleColumn {
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

impl Entity for Role {
    type Column = RoleColumn;

    const TABLE: &'static str = "roles";
    const SEQUENCE: &'static str = "roles_seq";
    const RELATIONS: &'static [Relation] = &[
        Relation::many_to_many(
            PERMISSIONS,
            "role_has_permissions",
            "role_id",
            "permission_id",
            "permissions",
            false,
        )
        .nested(relations_of::<Permission>),
        Relation::many_to_many(USERS, "user_has_roles", "role_id", "user_id", "users", true)
            .nested(relations_of::<User>),
    ];

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
            (RoleColumn::Id, Value::Integer(self.id)),
            (RoleColumn::Name, Value::Text(self.name.clone())),
            (RoleColumn::CreatedAt, Value::Integer(self.created_at)),
            (RoleColumn::UpdatedAt, Value::Integer(self.updated_at)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            permission_ids: None,
            user_ids: None,
            preloaded: Preloaded::new(),
        })
    }

    fn attach_related(&mut self, relation: &str, records: Vec<Record>) {
        match relation {
            PERMISSIONS => self.permission_ids = Some(record_ids(&records)),
            USERS => self.user_ids = Some(record_ids(&records)),
            _ => {}
        }
        self.preloaded.insert(relation.to_string(), records);
    }
}
