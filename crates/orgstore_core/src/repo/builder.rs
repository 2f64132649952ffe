//! Generic query execution engine.
//!
//! # Responsibility
//! - Translate a [`QueryConfig`] plus a terminal verb into SQL for any
//!   [`Entity`].
//! - Replace and clear association rows with explicit join-table statements.
//! - Resynchronize the entity sequence after every delete path.
//!
//! # Invariants
//! - Store failures are propagated unmodified inside [`RepoError::Db`].
//! - Bulk calls with zero ids fail with [`RepoError::InvalidInput`] before
//!   any statement is issued.
//! - Multi-statement writes run inside one savepoint, so they are atomic on
//!   their own and nest inside a caller transaction.
//! - Without an explicit order, rows are returned by `<table>.id ASC`.
//! - Preload paths are validated against the declared relations before any
//!   statement is issued.

use super::entity::{
    find_relation, now_epoch_ms, Column, Entity, Relation, RelationKind, DELETED_AT_COLUMN,
    ID_COLUMN, UPDATED_AT_COLUMN,
};
use super::error::{RepoError, RepoResult};
use super::filter::{placeholders, Predicate};
use super::patch::Patch;
use super::query::QueryConfig;
use super::related::Record;
use super::sequence;
use crate::db::Savepoint;
use log::info;
use rusqlite::types::{FromSql, Value};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet};

/// Column alias carrying the owner id in preload queries.
const OWNER_ALIAS: &str = "orgstore_owner_id";

/// Executes one configuration against one connection.
pub struct QueryBuilder<'q, E: Entity> {
    conn: &'q Connection,
    config: &'q QueryConfig<E>,
}

/// Rendered `WHERE` body and its bind values.
struct Conditions {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Conditions {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, predicate: &Predicate) {
        self.clauses.push(format!("({})", predicate.sql()));
        self.params.extend(predicate.params().iter().cloned());
    }

    fn render(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Preload paths grouped by their leading segment.
#[derive(Default)]
struct PreloadTree<'p> {
    children: BTreeMap<&'p str, PreloadTree<'p>>,
}

impl<'p> PreloadTree<'p> {
    fn parse(paths: &'p [String]) -> Self {
        let mut root = Self::default();
        for path in paths {
            let mut node = &mut root;
            for segment in path.split('.') {
                node = node.children.entry(segment.trim()).or_default();
            }
        }
        root
    }

    fn check(&self, table: &'static str, relations: &'static [Relation]) -> RepoResult<()> {
        for (name, child) in &self.children {
            let relation = find_relation(table, relations, name)?;
            child.check(relation.related_table(), (relation.nested)())?;
        }
        Ok(())
    }
}

impl<'q, E: Entity> QueryBuilder<'q, E> {
    pub fn new(conn: &'q Connection, config: &'q QueryConfig<E>) -> Self {
        Self { conn, config }
    }

    /// Returns every row matching the configuration, with preloads attached.
    ///
    /// Applies joins, predicates (conjunctively, in registration order),
    /// the soft-delete scope, `id > cursor` when a cursor is set, ordering
    /// and limit.
    pub fn find_all(&self) -> RepoResult<Vec<E>> {
        self.check_preloads()?;
        let mut rows = self.select(&[], true, self.config.limit())?;
        self.attach_preloads(&mut rows)?;
        Ok(rows)
    }

    /// Returns the first row of [`QueryBuilder::find_all`], if any.
    pub fn find_one(&self) -> RepoResult<Option<E>> {
        self.check_preloads()?;
        let mut rows = self.select(&[], true, Some(1))?;
        self.attach_preloads(&mut rows)?;
        Ok(rows.into_iter().next())
    }

    /// Returns one row by primary key.
    ///
    /// Cursor and limit do not apply.
    ///
    /// # Errors
    /// - [`RepoError::NotFound`] when the row is absent or out of scope.
    pub fn find_by_id(&self, id: i64) -> RepoResult<E> {
        self.check_preloads()?;
        let mut rows = self.select(&[Predicate::id_in::<E>(&[id])], false, None)?;
        self.attach_preloads(&mut rows)?;
        rows.into_iter().next().ok_or(RepoError::NotFound {
            table: E::TABLE,
            id,
        })
    }

    /// Returns the first row matching `predicate` and the configuration.
    ///
    /// Cursor and limit do not apply, so lookups by a unique key see every
    /// in-scope row.
    pub fn find_first_where(&self, predicate: Predicate) -> RepoResult<Option<E>> {
        self.check_preloads()?;
        let mut rows = self.select(&[predicate], false, Some(1))?;
        self.attach_preloads(&mut rows)?;
        Ok(rows.into_iter().next())
    }

    /// Returns the rows among `ids` that match the configuration.
    pub fn find_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<E>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.check_preloads()?;
        let mut rows = self.select(&[Predicate::id_in::<E>(ids)], true, self.config.limit())?;
        self.attach_preloads(&mut rows)?;
        Ok(rows)
    }

    /// Counts matching rows. Limit does not apply; cursor does.
    pub fn count(&self) -> RepoResult<i64> {
        let conditions = self.conditions(&[], true);
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}{};",
            E::TABLE,
            self.render_joins(),
            conditions.render()
        );
        let count = self
            .conn
            .query_row(&sql, params_from_iter(conditions.params.iter()), |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(count)
    }

    /// Sums `column` over matching rows; no rows yields zero.
    ///
    /// Integer columns sum exactly when read as `i64`.
    pub fn sum<T: FromSql>(&self, column: E::Column) -> RepoResult<T> {
        let conditions = self.conditions(&[], true);
        let sql = format!(
            "SELECT COALESCE(SUM({table}.{column}), 0) FROM {table}{}{};",
            self.render_joins(),
            conditions.render(),
            table = E::TABLE,
            column = column.name(),
        );
        let sum = self
            .conn
            .query_row(&sql, params_from_iter(conditions.params.iter()), |row| {
                row.get::<_, T>(0)
            })?;
        Ok(sum)
    }

    /// Inserts one row and returns it with its assigned id.
    ///
    /// An id of `0` is drawn from the entity sequence; an explicit id moves
    /// the sequence past it. Associations are not written.
    pub fn create(&self, entity: E) -> RepoResult<E> {
        let savepoint = Savepoint::begin(self.conn, "orgstore_create")?;
        let created = self.insert_row(entity, now_epoch_ms())?;
        savepoint.release()?;
        Ok(created)
    }

    /// Inserts all rows or none.
    pub fn create_many(&self, entities: Vec<E>) -> RepoResult<Vec<E>> {
        if entities.is_empty() {
            return Err(RepoError::InvalidInput(format!(
                "no {} rows to create",
                E::TABLE
            )));
        }

        let now_ms = now_epoch_ms();
        let savepoint = Savepoint::begin(self.conn, "orgstore_create_many")?;
        let mut created = Vec::with_capacity(entities.len());
        for entity in entities {
            created.push(self.insert_row(entity, now_ms)?);
        }
        savepoint.release()?;
        Ok(created)
    }

    /// Loads row `id`, replaces configured associations, then applies
    /// `patch` in a separate statement.
    ///
    /// The row is located ignoring the soft-delete scope when the builder is
    /// unscoped or the patch writes `deleted_at`, so restores work.
    /// Returns the row as loaded before the update.
    ///
    /// # Errors
    /// - [`RepoError::InvalidInput`] when there is nothing to write.
    /// - [`RepoError::NotFound`] when the row is absent or out of scope.
    pub fn update_by_id(&self, id: i64, patch: &Patch<E::Column>) -> RepoResult<E> {
        let replacements = self.pending_replacements()?;
        if patch.is_empty() && replacements.is_empty() {
            return Err(RepoError::InvalidInput(format!(
                "empty update for {} {id}",
                E::TABLE
            )));
        }

        let unscoped = self.write_unscoped(patch);
        let savepoint = Savepoint::begin(self.conn, "orgstore_update")?;
        let current = self.load_for_write(id, unscoped)?;
        for (relation, ids) in &replacements {
            self.replace_rows(id, relation, ids)?;
        }
        if !patch.is_empty() {
            self.apply_patch(&Predicate::id_in::<E>(&[id]), &[], patch)?;
        }
        savepoint.release()?;

        info!(
            "event=repo_update module=repo status=ok table={} id={id} columns={} replaced={}",
            E::TABLE,
            patch.assignments().len(),
            replacements.len()
        );
        Ok(current)
    }

    /// Applies `patch` to every in-scope row among `ids` that also matches
    /// the registered predicates.
    ///
    /// Without replacements this is one `UPDATE ... WHERE id IN (...)`. With
    /// replacements the matching ids are selected first, then each one is
    /// updated and re-associated in turn inside one savepoint.
    /// Returns the number of rows updated.
    pub fn update_many(&self, ids: &[i64], patch: &Patch<E::Column>) -> RepoResult<usize> {
        if ids.is_empty() {
            return Err(RepoError::InvalidInput(format!(
                "no {} ids to update",
                E::TABLE
            )));
        }
        let replacements = self.pending_replacements()?;
        let unscoped = self.write_unscoped(patch);

        if replacements.is_empty() {
            if patch.is_empty() {
                return Err(RepoError::InvalidInput(format!(
                    "empty update for {} rows",
                    E::TABLE
                )));
            }
            let mut extra = self.config.predicates().to_vec();
            if E::SOFT_DELETE && !unscoped {
                extra.push(Predicate::raw(
                    format!("{}.{DELETED_AT_COLUMN} IS NULL", E::TABLE),
                    [],
                ));
            }
            let changed = self.apply_patch(&Predicate::id_in::<E>(ids), &extra, patch)?;
            info!(
                "event=repo_update module=repo status=ok table={} rows={changed} columns={}",
                E::TABLE,
                patch.assignments().len()
            );
            return Ok(changed);
        }

        let savepoint = Savepoint::begin(self.conn, "orgstore_update_many")?;
        let targets = self.write_targets(ids, unscoped)?;
        for &id in &targets {
            if !patch.is_empty() {
                self.apply_patch(&Predicate::id_in::<E>(&[id]), &[], patch)?;
            }
            for (relation, related_ids) in &replacements {
                self.replace_rows(id, relation, related_ids)?;
            }
        }
        savepoint.release()?;

        info!(
            "event=repo_update module=repo status=ok table={} rows={} columns={} replaced={}",
            E::TABLE,
            targets.len(),
            patch.assignments().len(),
            replacements.len()
        );
        Ok(targets.len())
    }

    /// Deletes row `id` after clearing its configured associations, then
    /// resynchronizes the sequence.
    ///
    /// Soft-deletable entities are soft-deleted unless the builder is
    /// unscoped, in which case the row is purged. Returns the row as loaded
    /// before the delete.
    pub fn delete_by_id(&self, id: i64) -> RepoResult<E> {
        let associations = self.configured_associations()?;
        let purge = self.purges();

        let savepoint = Savepoint::begin(self.conn, "orgstore_delete")?;
        let current = self.load_for_write(id, self.config.is_unscoped())?;
        for relation in &associations {
            self.clear_rows(id, relation)?;
        }
        if purge {
            self.conn.execute(
                &format!("DELETE FROM {} WHERE {ID_COLUMN} = ?1;", E::TABLE),
                [id],
            )?;
        } else {
            self.conn.execute(
                &format!(
                    "UPDATE {} SET {DELETED_AT_COLUMN} = ?1 WHERE {ID_COLUMN} = ?2;",
                    E::TABLE
                ),
                params![now_epoch_ms(), id],
            )?;
        }
        sequence::resync(self.conn, E::TABLE, E::SEQUENCE)?;
        savepoint.release()?;

        info!(
            "event=repo_delete module=repo status=ok table={} id={id} mode={}",
            E::TABLE,
            delete_mode(purge)
        );
        Ok(current)
    }

    /// Deletes every in-scope row among `ids` in one statement, then
    /// resynchronizes the sequence. Associations are not cleared.
    ///
    /// Returns the number of rows affected.
    pub fn delete_many(&self, ids: &[i64]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Err(RepoError::InvalidInput(format!(
                "no {} ids to delete",
                E::TABLE
            )));
        }
        let purge = self.purges();

        let mut conditions = Conditions::new();
        conditions.push(&Predicate::id_in::<E>(ids));
        for predicate in self.config.predicates() {
            conditions.push(predicate);
        }

        let savepoint = Savepoint::begin(self.conn, "orgstore_delete_many")?;
        let changed = if purge {
            let sql = format!("DELETE FROM {}{};", E::TABLE, conditions.render());
            self.conn
                .execute(&sql, params_from_iter(conditions.params.iter()))?
        } else {
            conditions.push(&Predicate::raw(
                format!("{}.{DELETED_AT_COLUMN} IS NULL", E::TABLE),
                [],
            ));
            let sql = format!(
                "UPDATE {} SET {DELETED_AT_COLUMN} = ?{};",
                E::TABLE,
                conditions.render()
            );
            let mut params = vec![Value::Integer(now_epoch_ms())];
            params.extend(conditions.params.iter().cloned());
            self.conn.execute(&sql, params_from_iter(params.iter()))?
        };
        sequence::resync(self.conn, E::TABLE, E::SEQUENCE)?;
        savepoint.release()?;

        info!(
            "event=repo_delete module=repo status=ok table={} rows={changed} mode={}",
            E::TABLE,
            delete_mode(purge)
        );
        Ok(changed)
    }

    /// Makes `related_ids` the complete set of `relation` links of `owner_id`.
    ///
    /// Old links are cleared first; duplicate ids are written once.
    pub fn replace_association(
        &self,
        owner_id: i64,
        relation: &str,
        related_ids: &[i64],
    ) -> RepoResult<()> {
        let relation = relation_for::<E>(relation)?;
        let savepoint = Savepoint::begin(self.conn, "orgstore_replace")?;
        self.replace_rows(owner_id, relation, related_ids)?;
        savepoint.release()?;
        Ok(())
    }

    /// Removes every `relation` link of `owner_id`.
    pub fn clear_association(&self, owner_id: i64, relation: &str) -> RepoResult<()> {
        let relation = relation_for::<E>(relation)?;
        self.clear_rows(owner_id, relation)
    }

    fn select(&self, extra: &[Predicate], with_cursor: bool, limit: Option<u32>) -> RepoResult<Vec<E>> {
        let mut conditions = self.conditions(extra, with_cursor);
        let order = self
            .config
            .order()
            .map(|order| order.as_sql().to_string())
            .unwrap_or_else(|| format!("{}.{ID_COLUMN} ASC", E::TABLE));

        let mut sql = format!(
            "SELECT {} FROM {}{}{} ORDER BY {order}",
            select_columns::<E>(),
            E::TABLE,
            self.render_joins(),
            conditions.render()
        );
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            conditions.params.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(conditions.params.iter()))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }

    fn conditions(&self, extra: &[Predicate], with_cursor: bool) -> Conditions {
        let mut conditions = Conditions::new();
        if E::SOFT_DELETE && !self.config.is_unscoped() {
            conditions
                .clauses
                .push(format!("{}.{DELETED_AT_COLUMN} IS NULL", E::TABLE));
        }
        for predicate in self.config.predicates().iter().chain(extra) {
            conditions.push(predicate);
        }
        if with_cursor {
            if let Some(cursor) = self.config.cursor() {
                conditions
                    .clauses
                    .push(format!("{}.{ID_COLUMN} > ?", E::TABLE));
                conditions.params.push(Value::Integer(cursor));
            }
        }
        conditions
    }

    fn render_joins(&self) -> String {
        self.config
            .joins()
            .iter()
            .map(|join| format!(" {join}"))
            .collect()
    }

    /// Ids among `ids` matching the registered predicates and, unless
    /// `unscoped`, the soft-delete scope.
    fn write_targets(&self, ids: &[i64], unscoped: bool) -> RepoResult<Vec<i64>> {
        let mut conditions = Conditions::new();
        conditions.push(&Predicate::id_in::<E>(ids));
        for predicate in self.config.predicates() {
            conditions.push(predicate);
        }
        if E::SOFT_DELETE && !unscoped {
            conditions
                .clauses
                .push(format!("{}.{DELETED_AT_COLUMN} IS NULL", E::TABLE));
        }

        let sql = format!(
            "SELECT DISTINCT {table}.{ID_COLUMN} FROM {table}{}{} ORDER BY {table}.{ID_COLUMN} ASC;",
            self.render_joins(),
            conditions.render(),
            table = E::TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(conditions.params.iter()))?;
        let mut targets = Vec::new();
        while let Some(row) = rows.next()? {
            targets.push(row.get::<_, i64>(0)?);
        }
        Ok(targets)
    }

    fn load_for_write(&self, id: i64, unscoped: bool) -> RepoResult<E> {
        let mut sql = format!(
            "SELECT {} FROM {table} WHERE {table}.{ID_COLUMN} = ?1",
            select_columns::<E>(),
            table = E::TABLE
        );
        if E::SOFT_DELETE && !unscoped {
            sql.push_str(&format!(" AND {}.{DELETED_AT_COLUMN} IS NULL", E::TABLE));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(E::from_row(row)?),
            None => Err(RepoError::NotFound {
                table: E::TABLE,
                id,
            }),
        }
    }

    fn insert_row(&self, mut entity: E, now_ms: i64) -> RepoResult<E> {
        let id = if entity.id() == 0 {
            sequence::next_value(self.conn, E::SEQUENCE)?
        } else {
            sequence::advance_past(self.conn, E::SEQUENCE, entity.id())?;
            entity.id()
        };
        entity.before_insert(id, now_ms);

        let values = entity.insert_values();
        let columns = values
            .iter()
            .map(|(column, _)| column.name())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({});",
            E::TABLE,
            placeholders(values.len())
        );
        self.conn
            .execute(&sql, params_from_iter(values.iter().map(|(_, value)| value)))?;
        Ok(entity)
    }

    fn apply_patch(
        &self,
        target: &Predicate,
        extra: &[Predicate],
        patch: &Patch<E::Column>,
    ) -> RepoResult<usize> {
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (column, value) in patch.assignments() {
            assignments.push(format!("{} = ?", column.name()));
            params.push(value.clone());
        }
        if E::TIMESTAMPS && !patch.touches_name(UPDATED_AT_COLUMN) {
            assignments.push(format!("{UPDATED_AT_COLUMN} = ?"));
            params.push(Value::Integer(now_epoch_ms()));
        }

        let mut conditions = Conditions::new();
        conditions.push(target);
        for predicate in extra {
            conditions.push(predicate);
        }
        params.extend(conditions.params.iter().cloned());

        let sql = format!(
            "UPDATE {} SET {}{};",
            E::TABLE,
            assignments.join(", "),
            conditions.render()
        );
        let changed = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        Ok(changed)
    }

    fn replace_rows(&self, owner_id: i64, relation: &Relation, related_ids: &[i64]) -> RepoResult<()> {
        self.clear_rows(owner_id, relation)?;
        let unique: BTreeSet<i64> = related_ids.iter().copied().collect();

        match relation.kind {
            RelationKind::ManyToMany {
                join_table,
                owner_key,
                related_key,
                ..
            } => {
                let sql =
                    format!("INSERT INTO {join_table} ({owner_key}, {related_key}) VALUES (?1, ?2);");
                let mut stmt = self.conn.prepare(&sql)?;
                for related_id in unique {
                    stmt.execute(params![owner_id, related_id])?;
                }
            }
            RelationKind::HasMany {
                related_table,
                foreign_key,
                ..
            } => {
                let sql = format!("UPDATE {related_table} SET {foreign_key} = ?1 WHERE {ID_COLUMN} = ?2;");
                let mut stmt = self.conn.prepare(&sql)?;
                for related_id in unique {
                    if stmt.execute(params![owner_id, related_id])? == 0 {
                        return Err(RepoError::NotFound {
                            table: related_table,
                            id: related_id,
                        });
                    }
                }
            }
            RelationKind::BelongsTo { .. } => {
                return Err(RepoError::InvalidInput(format!(
                    "relation `{}` on `{}` is read-only; write its foreign key instead",
                    relation.name,
                    E::TABLE
                )));
            }
        }
        Ok(())
    }

    fn clear_rows(&self, owner_id: i64, relation: &Relation) -> RepoResult<()> {
        match relation.kind {
            RelationKind::ManyToMany {
                join_table,
                owner_key,
                ..
            } => {
                self.conn.execute(
                    &format!("DELETE FROM {join_table} WHERE {owner_key} = ?1;"),
                    [owner_id],
                )?;
            }
            RelationKind::HasMany {
                related_table,
                foreign_key,
                ..
            } => {
                self.conn.execute(
                    &format!("UPDATE {related_table} SET {foreign_key} = NULL WHERE {foreign_key} = ?1;"),
                    [owner_id],
                )?;
            }
            // The link lives on the owner row itself.
            RelationKind::BelongsTo { .. } => {}
        }
        Ok(())
    }

    fn check_preloads(&self) -> RepoResult<()> {
        PreloadTree::parse(self.config.preloads()).check(E::TABLE, E::RELATIONS)
    }

    fn attach_preloads(&self, rows: &mut [E]) -> RepoResult<()> {
        if rows.is_empty() || self.config.preloads().is_empty() {
            return Ok(());
        }

        let tree = PreloadTree::parse(self.config.preloads());
        let owner_ids: Vec<i64> = rows.iter().map(|row| row.id()).collect();
        for (name, children) in &tree.children {
            let relation = find_relation(E::TABLE, E::RELATIONS, name)?;
            let mut loaded = self.load_related(E::TABLE, relation, &owner_ids, children)?;
            for row in rows.iter_mut() {
                let records = loaded.remove(&row.id()).unwrap_or_default();
                row.attach_related(relation.name, records);
            }
        }
        Ok(())
    }

    /// Loads the in-scope records of `relation` for each owner in
    /// `owner_ids`, then the nested paths in `children` onto those records.
    fn load_related(
        &self,
        owner_table: &'static str,
        relation: &'static Relation,
        owner_ids: &[i64],
        children: &PreloadTree<'_>,
    ) -> RepoResult<BTreeMap<i64, Vec<Record>>> {
        let related_table = relation.related_table();
        let markers = placeholders(owner_ids.len());
        let scope = if relation.related_soft_delete() {
            format!(" AND r.{DELETED_AT_COLUMN} IS NULL")
        } else {
            String::new()
        };
        let sql = match relation.kind {
            RelationKind::ManyToMany {
                join_table,
                owner_key,
                related_key,
                ..
            } => format!(
                "SELECT j.{owner_key} AS {OWNER_ALIAS}, r.*
                 FROM {join_table} j
                 JOIN {related_table} r ON r.{ID_COLUMN} = j.{related_key}
                 WHERE j.{owner_key} IN ({markers}){scope}
                 ORDER BY j.{owner_key} ASC, r.{ID_COLUMN} ASC;"
            ),
            RelationKind::HasMany { foreign_key, .. } => format!(
                "SELECT r.{foreign_key} AS {OWNER_ALIAS}, r.*
                 FROM {related_table} r
                 WHERE r.{foreign_key} IN ({markers}){scope}
                 ORDER BY r.{foreign_key} ASC, r.{ID_COLUMN} ASC;"
            ),
            RelationKind::BelongsTo { foreign_key, .. } => format!(
                "SELECT o.{ID_COLUMN} AS {OWNER_ALIAS}, r.*
                 FROM {owner_table} o
                 JOIN {related_table} r ON r.{ID_COLUMN} = o.{foreign_key}
                 WHERE o.{ID_COLUMN} IN ({markers}){scope}
                 ORDER BY o.{ID_COLUMN} ASC;"
            ),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(owner_ids.iter()))?;
        let mut loaded: Vec<(i64, Record)> = Vec::new();
        while let Some(row) = rows.next()? {
            let owner_id: i64 = row.get(0)?;
            let mut record = Record::new(related_table);
            for (index, column) in columns.iter().enumerate().skip(1) {
                record.set(column, row.get::<_, Value>(index)?);
            }
            loaded.push((owner_id, record));
        }

        if !children.children.is_empty() && !loaded.is_empty() {
            let related_ids: Vec<i64> = loaded
                .iter()
                .map(|(_, record)| record.id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for (name, grandchildren) in &children.children {
                let nested = find_relation(related_table, (relation.nested)(), name)?;
                let grouped = self.load_related(related_table, nested, &related_ids, grandchildren)?;
                for (_, record) in loaded.iter_mut() {
                    let records = grouped.get(&record.id).cloned().unwrap_or_default();
                    record.related.insert(nested.name.to_string(), records);
                }
            }
        }

        let mut grouped: BTreeMap<i64, Vec<Record>> = BTreeMap::new();
        for (owner_id, record) in loaded {
            grouped.entry(owner_id).or_default().push(record);
        }
        Ok(grouped)
    }

    fn configured_associations(&self) -> RepoResult<Vec<&'static Relation>> {
        self.config
            .associations()
            .iter()
            .map(|name| relation_for::<E>(name))
            .collect()
    }

    /// Replacement sets whose relation is also a configured association.
    fn pending_replacements(&self) -> RepoResult<Vec<(&'static Relation, &'q [i64])>> {
        let associations = self.config.associations();
        let mut pending = Vec::new();
        for (name, ids) in self.config.replacements() {
            let relation = relation_for::<E>(name)?;
            if associations.iter().any(|association| association == name) {
                pending.push((relation, ids.as_slice()));
            }
        }
        Ok(pending)
    }

    fn write_unscoped(&self, patch: &Patch<E::Column>) -> bool {
        self.config.is_unscoped() || patch.touches_name(DELETED_AT_COLUMN)
    }

    fn purges(&self) -> bool {
        !E::SOFT_DELETE || self.config.is_unscoped()
    }
}

fn relation_for<E: Entity>(name: &str) -> RepoResult<&'static Relation> {
    find_relation(E::TABLE, E::RELATIONS, name)
}

fn select_columns<E: Entity>() -> String {
    E::Column::ALL
        .iter()
        .map(|column| format!("{table}.{name} AS {name}", table = E::TABLE, name = column.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn delete_mode(purge: bool) -> &'static str {
    if purge {
        "purge"
    } else {
        "soft"
    }
}
