//! Immutable query configuration.
//!
//! # Responsibility
//! - Accumulate preloads, joins, predicates, ordering, limit, cursor,
//!   association names, replacement sets and scope for one entity type.
//!
//! # Invariants
//! - Every `with_*` method returns a new value and leaves `self` untouched.
//! - Preloads, joins, predicates and associations append; order, limit,
//!   cursor and unscoped replace; replacements merge by relation name.
//! - A configuration holds no connection and is `Send + Sync`, so one value
//!   can serve as a template for many concurrent requests.

use super::entity::Entity;
use super::filter::{Filter, OrderBy, Predicate, SortDirection};
use rusqlite::types::Value;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Accumulated query configuration for entity `E`.
pub struct QueryConfig<E: Entity> {
    preloads: Vec<String>,
    joins: Vec<String>,
    predicates: Vec<Predicate>,
    order: Option<OrderBy>,
    limit: Option<u32>,
    cursor: Option<i64>,
    associations: Vec<String>,
    replacements: BTreeMap<String, Vec<i64>>,
    unscoped: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for QueryConfig<E> {
    fn clone(&self) -> Self {
        Self {
            preloads: self.preloads.clone(),
            joins: self.joins.clone(),
            predicates: self.predicates.clone(),
            order: self.order.clone(),
            limit: self.limit,
            cursor: self.cursor,
            associations: self.associations.clone(),
            replacements: self.replacements.clone(),
            unscoped: self.unscoped,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Default for QueryConfig<E> {
    fn default() -> Self {
        Self {
            preloads: Vec::new(),
            joins: Vec::new(),
            predicates: Vec::new(),
            order: None,
            limit: None,
            cursor: None,
            associations: Vec::new(),
            replacements: BTreeMap::new(),
            unscoped: false,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Debug for QueryConfig<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryConfig")
            .field("table", &E::TABLE)
            .field("preloads", &self.preloads)
            .field("joins", &self.joins)
            .field("predicates", &self.predicates)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("cursor", &self.cursor)
            .field("associations", &self.associations)
            .field("replacements", &self.replacements)
            .field("unscoped", &self.unscoped)
            .finish()
    }
}

impl<E: Entity> QueryConfig<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preloads<I, S>(&self, preloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.preloads.extend(preloads.into_iter().map(Into::into));
        next
    }

    /// Appends trusted join clauses, e.g. `JOIN divisions ON ...`.
    pub fn with_joins<I, S>(&self, joins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.joins.extend(joins.into_iter().map(Into::into));
        next
    }

    /// Appends one conjunct to the where clause.
    pub fn with_predicate(&self, predicate: Predicate) -> Self {
        let mut next = self.clone();
        next.predicates.push(predicate);
        next
    }

    /// Appends a trusted SQL fragment with `?` placeholders.
    pub fn with_where(
        &self,
        sql: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.with_predicate(Predicate::raw(sql, params))
    }

    /// Appends a typed filter on one of `E`'s columns.
    pub fn with_filter(&self, filter: Filter<E::Column>) -> Self {
        self.with_predicate(Predicate::filter::<E>(filter))
    }

    pub fn with_order_by(&self, order: OrderBy) -> Self {
        let mut next = self.clone();
        next.order = Some(order);
        next
    }

    pub fn with_order(&self, column: E::Column, direction: SortDirection) -> Self {
        self.with_order_by(OrderBy::column::<E>(column, direction))
    }

    pub fn with_limit(&self, limit: u32) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    /// Keyset cursor: only rows with `id > cursor` are returned.
    pub fn with_cursor(&self, cursor: i64) -> Self {
        let mut next = self.clone();
        next.cursor = Some(cursor);
        next
    }

    /// Marks relations as eligible for replacement and delete-time clearing.
    pub fn with_associations<I, S>(&self, associations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        for association in associations {
            let association = association.into();
            if !next.associations.contains(&association) {
                next.associations.push(association);
            }
        }
        next
    }

    /// Sets the authoritative related-id set for one relation.
    pub fn with_replacement(&self, relation: impl Into<String>, ids: Vec<i64>) -> Self {
        let mut next = self.clone();
        next.replacements.insert(relation.into(), ids);
        next
    }

    /// Merges replacement sets; later values win per relation name.
    pub fn with_replacements<I, S>(&self, replacements: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<i64>)>,
        S: Into<String>,
    {
        let mut next = self.clone();
        for (relation, ids) in replacements {
            next.replacements.insert(relation.into(), ids);
        }
        next
    }

    /// Includes soft-deleted rows in reads and targets them in writes.
    pub fn with_unscoped(&self) -> Self {
        let mut next = self.clone();
        next.unscoped = true;
        next
    }

    pub fn preloads(&self) -> &[String] {
        &self.preloads
    }

    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    pub fn associations(&self) -> &[String] {
        &self.associations
    }

    pub fn replacements(&self) -> &BTreeMap<String, Vec<i64>> {
        &self.replacements
    }

    pub fn is_unscoped(&self) -> bool {
        self.unscoped
    }
}
