//! Entity-typed repository over the generic query builder.
//!
//! # Responsibility
//! - Bind a [`QueryConfig`] to one connection or transaction.
//! - Expose chainable configuration and entity-typed terminal operations.
//!
//! # Invariants
//! - `with_*` methods never mutate `self`; each returns a new repository.
//! - A repository bound with [`Repository::with_tx`] belongs to one unit of
//!   work and must not outlive it.

use super::builder::QueryBuilder;
use super::entity::Entity;
use super::error::RepoResult;
use super::filter::{Filter, OrderBy, Predicate, SortDirection};
use super::patch::Patch;
use super::query::QueryConfig;
use rusqlite::types::{FromSql, Value};
use rusqlite::Connection;

/// Chainable repository for entity `E` bound to connection `'c`.
pub struct Repository<'c, E: Entity> {
    conn: &'c Connection,
    config: QueryConfig<E>,
}

impl<E: Entity> Clone for Repository<'_, E> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn,
            config: self.config.clone(),
        }
    }
}

impl<'c, E: Entity> Repository<'c, E> {
    /// Creates an unconfigured repository on `conn`.
    pub fn new(conn: &'c Connection) -> Self {
        Self::from_config(conn, QueryConfig::new())
    }

    /// Binds a shared configuration template to `conn`.
    pub fn from_config(conn: &'c Connection, config: QueryConfig<E>) -> Self {
        Self { conn, config }
    }

    /// Returns a repository with the same configuration bound to `tx`.
    ///
    /// `self` stays bound to its original connection.
    pub fn with_tx<'t>(&self, tx: &'t Connection) -> Repository<'t, E> {
        Repository::from_config(tx, self.config.clone())
    }

    pub fn config(&self) -> &QueryConfig<E> {
        &self.config
    }

    pub fn conn(&self) -> &'c Connection {
        self.conn
    }

    fn derive(&self, config: QueryConfig<E>) -> Self {
        Self::from_config(self.conn, config)
    }

    pub fn with_preloads<I, S>(&self, preloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.derive(self.config.with_preloads(preloads))
    }

    pub fn with_joins<I, S>(&self, joins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.derive(self.config.with_joins(joins))
    }

    pub fn with_where(
        &self,
        sql: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.derive(self.config.with_where(sql, params))
    }

    pub fn with_predicate(&self, predicate: Predicate) -> Self {
        self.derive(self.config.with_predicate(predicate))
    }

    pub fn with_filter(&self, filter: Filter<E::Column>) -> Self {
        self.derive(self.config.with_filter(filter))
    }

    pub fn with_order(&self, column: E::Column, direction: SortDirection) -> Self {
        self.derive(self.config.with_order(column, direction))
    }

    pub fn with_order_by(&self, order: OrderBy) -> Self {
        self.derive(self.config.with_order_by(order))
    }

    pub fn with_limit(&self, limit: u32) -> Self {
        self.derive(self.config.with_limit(limit))
    }

    pub fn with_cursor(&self, cursor: i64) -> Self {
        self.derive(self.config.with_cursor(cursor))
    }

    pub fn with_associations<I, S>(&self, associations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.derive(self.config.with_associations(associations))
    }

    pub fn with_replacement(&self, relation: impl Into<String>, ids: Vec<i64>) -> Self {
        self.derive(self.config.with_replacement(relation, ids))
    }

    pub fn with_replacements<I, S>(&self, replacements: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<i64>)>,
        S: Into<String>,
    {
        self.derive(self.config.with_replacements(replacements))
    }

    pub fn with_unscoped(&self) -> Self {
        self.derive(self.config.with_unscoped())
    }

    /// Returns the query builder executing this repository's configuration.
    pub fn builder(&self) -> QueryBuilder<'_, E> {
        QueryBuilder::new(self.conn, &self.config)
    }

    pub fn find_all(&self) -> RepoResult<Vec<E>> {
        self.builder().find_all()
    }

    pub fn find_one(&self) -> RepoResult<Option<E>> {
        self.builder().find_one()
    }

    pub fn find_by_id(&self, id: i64) -> RepoResult<E> {
        self.builder().find_by_id(id)
    }

    pub fn find_first_where(&self, filter: Filter<E::Column>) -> RepoResult<Option<E>> {
        self.builder()
            .find_first_where(Predicate::filter::<E>(filter))
    }

    pub fn find_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<E>> {
        self.builder().find_by_ids(ids)
    }

    pub fn count(&self) -> RepoResult<i64> {
        self.builder().count()
    }

    pub fn sum<T: FromSql>(&self, column: E::Column) -> RepoResult<T> {
        self.builder().sum(column)
    }

    pub fn insert(&self, entity: E) -> RepoResult<E> {
        self.builder().create(entity)
    }

    pub fn insert_many(&self, entities: Vec<E>) -> RepoResult<Vec<E>> {
        self.builder().create_many(entities)
    }

    pub fn update_by_id(&self, id: i64, patch: &Patch<E::Column>) -> RepoResult<E> {
        self.builder().update_by_id(id, patch)
    }

    pub fn update_many(&self, ids: &[i64], patch: &Patch<E::Column>) -> RepoResult<usize> {
        self.builder().update_many(ids, patch)
    }

    pub fn remove_by_id(&self, id: i64) -> RepoResult<E> {
        self.builder().delete_by_id(id)
    }

    pub fn remove_many(&self, ids: &[i64]) -> RepoResult<usize> {
        self.builder().delete_many(ids)
    }

    pub fn replace_association(
        &self,
        owner_id: i64,
        relation: &str,
        related_ids: &[i64],
    ) -> RepoResult<()> {
        self.builder()
            .replace_association(owner_id, relation, related_ids)
    }

    pub fn clear_association(&self, owner_id: i64, relation: &str) -> RepoResult<()> {
        self.builder().clear_association(owner_id, relation)
    }
}
