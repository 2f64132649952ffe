//! Where-clause predicates and ordering for entity queries.
//!
//! # Invariants
//! - A predicate is a SQL fragment with `?` placeholders plus its bind
//!   values in placeholder order.
//! - Typed filters always qualify the column with the entity table.

use super::entity::{Column, Entity};
use rusqlite::types::Value;

/// One conjunct of a `WHERE` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    sql: String,
    params: Vec<Value>,
}

impl Predicate {
    /// Builds a predicate from a trusted SQL fragment and its bind values.
    pub fn raw(sql: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        Self {
            sql: sql.into(),
            params: params.into_iter().collect(),
        }
    }

    /// Builds a predicate from a typed filter on table `E`.
    pub fn filter<E: Entity>(filter: Filter<E::Column>) -> Self {
        let qualified = |column: E::Column| format!("{}.{}", E::TABLE, column.name());
        match filter {
            Filter::Eq(column, value) => Self::raw(format!("{} = ?", qualified(column)), [value]),
            Filter::NotEq(column, value) => {
                Self::raw(format!("{} <> ?", qualified(column)), [value])
            }
            Filter::Like(column, pattern) => Self::raw(
                format!("{} LIKE ?", qualified(column)),
                [Value::Text(pattern)],
            ),
            Filter::Gt(column, value) => Self::raw(format!("{} > ?", qualified(column)), [value]),
            Filter::Lt(column, value) => Self::raw(format!("{} < ?", qualified(column)), [value]),
            Filter::In(column, values) => {
                if values.is_empty() {
                    return Self::raw("0 = 1", []);
                }
                Self::raw(
                    format!("{} IN ({})", qualified(column), placeholders(values.len())),
                    values,
                )
            }
            Filter::IsNull(column) => Self::raw(format!("{} IS NULL", qualified(column)), []),
            Filter::IsNotNull(column) => {
                Self::raw(format!("{} IS NOT NULL", qualified(column)), [])
            }
        }
    }

    /// Predicate `<table>.id IN (ids)`.
    pub fn id_in<E: Entity>(ids: &[i64]) -> Self {
        Self::filter::<E>(Filter::In(
            id_column::<E>(),
            ids.iter().copied().map(Value::Integer).collect(),
        ))
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Typed comparison on one column of an entity table.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter<C> {
    Eq(C, Value),
    NotEq(C, Value),
    /// SQLite `LIKE`, ASCII case-insensitive.
    Like(C, String),
    Gt(C, Value),
    Lt(C, Value),
    /// An empty list matches nothing.
    In(C, Vec<Value>),
    IsNull(C),
    IsNotNull(C),
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parses `asc`/`desc`, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Rendered `ORDER BY` clause body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy(String);

impl OrderBy {
    /// Orders by one column of table `E`, with `id` as tiebreaker.
    pub fn column<E: Entity>(column: E::Column, direction: SortDirection) -> Self {
        let mut clause = format!("{}.{} {}", E::TABLE, column.name(), direction.sql());
        if column.name() != "id" {
            clause.push_str(&format!(", {}.id ASC", E::TABLE));
        }
        Self(clause)
    }

    /// Orders by a trusted clause, e.g. a column of a joined table.
    pub fn raw(clause: impl Into<String>) -> Self {
        Self(clause.into())
    }

    /// Resolves user-supplied sort/order strings against the columns of `E`.
    ///
    /// Returns `None` for unknown columns or directions.
    pub fn parse<E: Entity>(column: &str, direction: &str) -> Option<Self> {
        let column = E::Column::from_name(column.trim())?;
        let direction = SortDirection::parse(direction)?;
        Some(Self::column::<E>(column, direction))
    }

    pub fn as_sql(&self) -> &str {
        &self.0
    }
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn id_column<E: Entity>() -> E::Column {
    // `id` is part of every entity's column set.
    E::Column::from_name("id").unwrap_or(E::Column::ALL[0])
}
