//! Use-case services over the generic repositories.
//!
//! # Responsibility
//! - Apply business rules: password hashing, code generation, tombstone
//!   codes on soft delete and code regeneration on restore.
//! - Translate store failures into the [`ServiceError`] taxonomy.
//!
//! # Invariants
//! - Multi-step operations run inside one savepoint on the bound
//!   connection, so they are atomic alone and inside a caller transaction.

mod access_service;
mod catalog_service;
pub mod password;
mod user_service;

pub use access_service::AccessService;
pub use catalog_service::{CatalogService, ListFilter};
pub use user_service::{UserService, UserUpdate};

use crate::repo::RepoError;
use rusqlite::ffi;
use rusqlite::ErrorCode;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Category of a violated store constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    PrimaryKey,
    ForeignKey,
    NotNull,
    Check,
    /// Raised by a trigger with `RAISE(ABORT, ...)`.
    Trigger,
    Other,
}

impl Display for ConstraintKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unique => "unique",
            Self::PrimaryKey => "primary key",
            Self::ForeignKey => "foreign key",
            Self::NotNull => "not null",
            Self::Check => "check",
            Self::Trigger => "trigger",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// Caller-facing error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Row absent, including soft-deleted rows under the default scope.
    #[error("{table} row not found: {id}")]
    NotFound { table: &'static str, id: i64 },
    #[error("{kind} constraint violated: {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        message: String,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    /// Any other store-level failure.
    #[error("query failed: {0}")]
    QueryFailure(#[source] RepoError),
}

impl ServiceError {
    /// Returns the violated constraint category, if any.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::ConstraintViolation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { table, id } => Self::NotFound { table, id },
            RepoError::InvalidInput(message) => Self::InvalidInput(message),
            RepoError::UnknownRelation { .. } => Self::InvalidInput(value.to_string()),
            other => match other.sqlite().and_then(classify_constraint) {
                Some((kind, message)) => Self::ConstraintViolation { kind, message },
                None => Self::QueryFailure(other),
            },
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(RepoError::from(value))
    }
}

/// Classifies a SQLite constraint failure by its extended result code.
fn classify_constraint(err: &rusqlite::Error) -> Option<(ConstraintKind, String)> {
    let rusqlite::Error::SqliteFailure(failure, message) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }

    let kind = match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
        ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintKind::PrimaryKey,
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
        ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
        ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
        ffi::SQLITE_CONSTRAINT_TRIGGER => ConstraintKind::Trigger,
        _ => ConstraintKind::Other,
    };
    let message = message.clone().unwrap_or_else(|| failure.to_string());
    Some((kind, message))
}
