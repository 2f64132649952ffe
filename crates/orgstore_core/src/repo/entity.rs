//! Entity descriptors consumed by the generic query builder.
//!
//! # Responsibility
//! - Describe a table: name, sequence, columns, soft-delete and timestamp
//!   support, and the relations that can be preloaded or replaced.
//! - Map rows to entity values and entity values to insert assignments.
//!
//! # Invariants
//! - Every entity table has an integer `id` primary key.
//! - Soft-deletable tables carry a nullable `deleted_at` column.
//! - Timestamped tables carry `created_at` and `updated_at` columns.

use super::error::{RepoError, RepoResult};
use super::related::Record;
use rusqlite::types::Value;
use rusqlite::Row;
use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

pub const ID_COLUMN: &str = "id";
pub const DELETED_AT_COLUMN: &str = "deleted_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Closed set of columns for one entity table.
pub trait Column: Copy + Eq + Debug + Send + Sync + 'static {
    /// All columns in select order.
    const ALL: &'static [Self];

    /// Unqualified SQL column name.
    fn name(self) -> &'static str;

    /// Resolves a column from its SQL name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|column| column.name() == name)
    }
}

/// How an owner row is linked to related rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Links stored in a join table.
    ManyToMany {
        join_table: &'static str,
        owner_key: &'static str,
        related_key: &'static str,
        related_table: &'static str,
        related_soft_delete: bool,
    },
    /// Related rows point back at the owner through a nullable foreign key.
    HasMany {
        related_table: &'static str,
        foreign_key: &'static str,
        related_soft_delete: bool,
    },
    /// The owner row points at one related row through `foreign_key`.
    BelongsTo {
        related_table: &'static str,
        foreign_key: &'static str,
        related_soft_delete: bool,
    },
}

/// Named relation of an entity.
///
/// `nested` lists the relations of the related table, so preload paths such
/// as `roles.permissions` resolve one segment at a time.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub name: &'static str,
    pub kind: RelationKind,
    pub nested: fn() -> &'static [Relation],
}

impl Relation {
    pub const fn many_to_many(
        name: &'static str,
        join_table: &'static str,
        owner_key: &'static str,
        related_key: &'static str,
        related_table: &'static str,
        related_soft_delete: bool,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::ManyToMany {
                join_table,
                owner_key,
                related_key,
                related_table,
                related_soft_delete,
            },
            nested: no_relations,
        }
    }

    pub const fn has_many(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
        related_soft_delete: bool,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::HasMany {
                related_table,
                foreign_key,
                related_soft_delete,
            },
            nested: no_relations,
        }
    }

    /// Relation read through `foreign_key` on the owner table. Preload only.
    pub const fn belongs_to(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
        related_soft_delete: bool,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsTo {
                related_table,
                foreign_key,
                related_soft_delete,
            },
            nested: no_relations,
        }
    }

    /// Declares the relations reachable from the related table, usually
    /// `relations_of::<Related>`.
    pub const fn nested(self, nested: fn() -> &'static [Relation]) -> Self {
        Self {
            name: self.name,
            kind: self.kind,
            nested,
        }
    }

    pub fn related_table(&self) -> &'static str {
        match self.kind {
            RelationKind::ManyToMany { related_table, .. }
            | RelationKind::HasMany { related_table, .. }
            | RelationKind::BelongsTo { related_table, .. } => related_table,
        }
    }

    pub fn related_soft_delete(&self) -> bool {
        match self.kind {
            RelationKind::ManyToMany {
                related_soft_delete,
                ..
            }
            | RelationKind::HasMany {
                related_soft_delete,
                ..
            }
            | RelationKind::BelongsTo {
                related_soft_delete,
                ..
            } => related_soft_delete,
        }
    }
}

/// Declared relations of `E`, usable as [`Relation::nested`].
pub fn relations_of<E: Entity>() -> &'static [Relation] {
    E::RELATIONS
}

fn no_relations() -> &'static [Relation] {
    &[]
}

/// Finds relation `name` among `relations` of `table`.
pub(crate) fn find_relation(
    table: &'static str,
    relations: &'static [Relation],
    name: &str,
) -> RepoResult<&'static Relation> {
    relations
        .iter()
        .find(|relation| relation.name == name)
        .ok_or_else(|| RepoError::UnknownRelation {
            table,
            relation: name.to_string(),
        })
}

/// Persisted business entity handled by the generic query builder.
pub trait Entity: Clone + Send + Sync + 'static {
    type Column: Column;

    const TABLE: &'static str;
    const SEQUENCE: &'static str;
    const SOFT_DELETE: bool = false;
    const TIMESTAMPS: bool = true;
    const RELATIONS: &'static [Relation] = &[];

    /// Primary key; `0` means "not yet assigned".
    fn id(&self) -> i64;

    /// Assigns identity, timestamps and derived defaults right before insert.
    fn before_insert(&mut self, id: i64, now_ms: i64);

    /// Column assignments written by `INSERT`, including `id`.
    fn insert_values(&self) -> Vec<(Self::Column, Value)>;

    /// Builds an entity from a row selected with every column in
    /// [`Column::ALL`], aliased to its unqualified name.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Receives the records preloaded for `relation`.
    fn attach_related(&mut self, relation: &str, records: Vec<Record>) {
        let _ = (relation, records);
    }
}
