//! Core data-access layer for the organization store.
//! This crate owns the schema, the generic repositories and the business
//! rules layered on top of them.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use db::{
    in_transaction, open_db, open_db_in_memory, open_with_config, DbError, DbResult, Savepoint,
};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::{
    CatalogEntity, Department, Division, Level, Permission, Position, Role, Title, User,
};
pub use repo::{
    Entity, Filter, OrderBy, Patch, QueryBuilder, QueryConfig, RepoError, RepoResult,
    Repository, SortDirection,
};
pub use service::{
    AccessService, CatalogService, ConstraintKind, ListFilter, ServiceError, ServiceResult,
    UserService, UserUpdate,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
