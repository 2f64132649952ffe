//! Repository error type.
//!
//! Store failures are carried unmodified inside [`RepoError::Db`]; callers
//! that need a domain taxonomy classify them one layer up.

use crate::db::DbError;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for query, write and sequence operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Row is absent, or soft-deleted under the default scope.
    #[error("{table} row not found: {id}")]
    NotFound { table: &'static str, id: i64 },
    /// Empty payload or empty id list on an operation that needs rows.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Preload or association name that the entity does not declare.
    #[error("unknown relation `{relation}` on `{table}`")]
    UnknownRelation {
        table: &'static str,
        relation: String,
    },
    /// Sequence row missing from the `sequences` table.
    #[error("sequence `{0}` is not registered")]
    MissingSequence(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Returns the underlying SQLite error, if this is a store failure.
    pub fn sqlite(&self) -> Option<&rusqlite::Error> {
        match self {
            Self::Db(DbError::Sqlite(err)) => Some(err),
            _ => None,
        }
    }

    /// Returns whether this error means "row absent".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
