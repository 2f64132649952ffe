//! Organization domain model.
//!
//! # Responsibility
//! - Define the persisted business entities and their column sets.
//! - Derive default codes on insert and on restore.
//!
//! # Invariants
//! - Ids come from the table sequence; `0` means "not yet assigned".
//! - Timestamps are Unix epoch milliseconds.
//! - `deleted_at = None` means active; `Some(_)` means soft-deleted.

pub mod code;
pub mod department;
pub mod division;
pub mod level;
pub mod permission;
pub mod position;
pub mod role;
pub mod title;
pub mod user;

use crate::repo::Entity;

pub use department::{Department, DepartmentColumn};
pub use division::{Division, DivisionColumn};
pub use level::{Level, LevelColumn};
pub use permission::{Permission, PermissionColumn};
pub use position::{Position, PositionColumn};
pub use role::{Role, RoleColumn};
pub use title::{Title, TitleColumn};
pub use user::{User, UserColumn};

/// Soft-deletable entity with a unique human-readable `code`.
///
/// Catalog rows get a generated code on insert when none is given, a
/// tombstone code on soft delete, and a regenerated code on restore.
pub trait CatalogEntity: Entity {
    const NAME_COLUMN: Self::Column;
    const CODE_COLUMN: Self::Column;
    const DELETED_AT_COLUMN: Self::Column;

    fn name(&self) -> &str;

    fn code(&self) -> Option<&str>;

    fn deleted_at(&self) -> Option<i64>;

    /// Code assigned to row `id` named `name`.
    fn generated_code(id: i64, name: &str) -> String;
}
