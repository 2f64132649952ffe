//! User entity.
//!
//! # Invariants
//! - `password` holds a PHC-format hash, never plaintext, once persisted.
//! - `password` is never serialized.

use super::code::user_code;
use super::CatalogEntity;
use super::role::Role;
use super::title::Title;
use crate::repo::{record_ids, relations_of, Column, Entity, Preloaded, Record, Relation};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Relation name for the roles granted to a user.
pub const ROLES: &str = "roles";
/// Relation name for the title a user holds.
pub const TITLE: &str = "title";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub title_id: Option<i64>,
    pub code: Option<String>,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<i64>,
    #[serde(default, skip_serializing)]
    pub password: String,
    pub remember_token: Option<String>,
    pub custom_fields: Option<serde_json::Value>,
    pub avatar_url: Option<String>,
    pub is_password_default: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    /// Filled only when `roles` is preloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<i64>>,
    /// Related records, keyed by preloaded relation name.
    #[serde(default, skip_serializing_if = "Preloaded::is_empty")]
    pub preloaded: Preloaded,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: 0,
            title_id: None,
            code: None,
            name: String::new(),
            email: String::new(),
            email_verified_at: None,
            password: String::new(),
            remember_token: None,
            custom_fields: None,
            avatar_url: None,
            is_password_default: true,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
            role_ids: None,
            preloaded: Preloaded::new(),
        }
    }
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    Id,
    TitleId,
    Code,
    Name,
    Email,
    EmailVerifiedAt,
    Password,
    RememberToken,
    CustomFields,
    AvatarUrl,
    IsPasswordDefault,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl Column for UserColumn {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::TitleId,
        Self::Code,
        Self::Name,
        Self::Email,
        Self::EmailVerifiedAt,
        Self::Password,
        Self::RememberToken,
        Self::CustomFields,
        Self::AvatarUrl,
        Self::IsPasswordDefault,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::DeletedAt,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::TitleId => "title_id",
            Self::Code => "code",
            Self::Name => "name",
            Self::Email => "email",
            Self::EmailVerifiedAt => "email_verified_at",
            Self::Password => "password",
            Self::RememberToken => "remember_token",
            Self::CustomFields => "custom_fields",
            Self::AvatarUrl => "avatar_url",
            Self::IsPasswordDefault => "is_password_default",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
        }
    }
}

impl Entity for User {
    type Column = UserColumn;

    const TABLE: &'static str = "users";
    const SEQUENCE: &'static str = "users_seq";
    const SOFT_DELETE: bool = true;
    const RELATIONS: &'static [Relation] = &[
        Relation::many_to_many(ROLES, "user_has_roles", "user_id", "role_id", "roles", false)
            .nested(relations_of::<Role>),
        Relation::belongs_to(TITLE, "titles", "title_id", true).nested(relations_of::<Title>),
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn before_insert(&mut self, id: i64, now_ms: i64) {
        self.id = id;
        self.created_at = now_ms;
        self.updated_at = now_ms;
        self.code = Some(user_code(id));
    }

    fn insert_values(&self) -> Vec<(Self::Column, Value)> {
        vec![
            (UserColumn::Id, Value::Integer(self.id)),
            (UserColumn::TitleId, self.title_id.into()),
            (UserColumn::Code, self.code.clone().into()),
            (UserColumn::Name, Value::Text(self.name.clone())),
            (UserColumn::Email, Value::Text(self.email.clone())),
            (UserColumn::EmailVerifiedAt, self.email_verified_at.into()),
            (UserColumn::Password, Value::Text(self.password.clone())),
            (UserColumn::RememberToken, self.remember_token.clone().into()),
            (
                UserColumn::CustomFields,
                self.custom_fields.as_ref().map(ToString::to_string).into(),
            ),
            (UserColumn::AvatarUrl, self.avatar_url.clone().into()),
            (
                UserColumn::IsPasswordDefault,
                Value::Integer(i64::from(self.is_password_default)),
            ),
            (UserColumn::CreatedAt, Value::Integer(self.created_at)),
            (UserColumn::UpdatedAt, Value::Integer(self.updated_at)),
            (UserColumn::DeletedAt, self.deleted_at.into()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title_id: row.get("title_id")?,
            code: row.get("code")?,
            name: row.get("name")?,
            email: row.get("email")?,
            email_verified_at: row.get("email_verified_at")?,
            password: row.get("password")?,
            remember_token: row.get("remember_token")?,
            custom_fields: row.get("custom_fields")?,
            avatar_url: row.get("avatar_url")?,
            is_password_default: row.get("is_password_default")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
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

impl CatalogEntity for User {
    const NAME_COLUMN: Self::Column = UserColumn::Name;
    const CODE_COLUMN: Self::Column = UserColumn::Code;
    const DELETED_AT_COLUMN: Self::Column = UserColumn::DeletedAt;

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
        user_code(id)
    }
}
