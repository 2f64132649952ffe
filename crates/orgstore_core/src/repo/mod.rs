//! Generic data-access layer.
//!
//! # Responsibility
//! - Describe entity tables ([`Entity`], [`Column`], [`Relation`]).
//! - Accumulate immutable query configuration ([`QueryConfig`]).
//! - Execute configurations against a connection ([`QueryBuilder`]).
//! - Expose chainable, entity-typed repositories ([`Repository`]).
//! - Keep primary-key sequences in step with deletes ([`sequence`]).
//!
//! # Invariants
//! - Configuration methods never mutate their receiver.
//! - Store errors cross this layer unmodified; classification happens in
//!   the service layer.

mod builder;
mod catalog_repo;
mod entity;
mod error;
mod filter;
mod patch;
mod query;
mod related;
mod repository;
pub mod sequence;
mod user_repo;

pub use builder::QueryBuilder;
pub use catalog_repo::{
    DepartmentRepository, DivisionRepository, LevelRepository, PermissionRepository,
    PositionRepository, RoleRepository, TitleRepository,
};
pub use entity::{
    now_epoch_ms, relations_of, Column, Entity, Relation, RelationKind, DELETED_AT_COLUMN,
    ID_COLUMN, UPDATED_AT_COLUMN,
};
pub use error::{RepoError, RepoResult};
pub use filter::{Filter, OrderBy, Predicate, SortDirection};
pub use patch::Patch;
pub use query::QueryConfig;
pub use related::{record_ids, Preloaded, Record};
pub use repository::Repository;
pub use sequence::SequenceState;
pub use user_repo::UserRepository;
