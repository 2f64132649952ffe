//! Primary-key sequences and their resynchronization.
//!
//! # Responsibility
//! - Hand out primary keys from per-table sequence rows.
//! - Recompute a sequence from surviving rows after deletes.
//!
//! # Invariants
//! - `sequences.next_value` is the id the NEXT insert receives.
//! - After resync, `next_value = max(id) + 1`, or `1` for an empty table.
//!   Deleting the max row of a table holding `1..=N` therefore makes the
//!   next insert receive `N`.
//! - Soft-deleted rows are physically present and keep their ids reserved.

use super::error::{RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Instant;

/// Snapshot of one sequence row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceState {
    pub name: String,
    pub table_name: String,
    pub next_value: i64,
}

/// Returns the next id from sequence `name` and advances it by one.
///
/// # Errors
/// - [`RepoError::MissingSequence`] when `name` is not registered.
pub fn next_value(conn: &Connection, name: &str) -> RepoResult<i64> {
    conn.query_row(
        "UPDATE sequences SET next_value = next_value + 1
         WHERE name = ?1
         RETURNING next_value - 1;",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .optional()?
    .ok_or_else(|| RepoError::MissingSequence(name.to_string()))
}

/// Reads the next id of sequence `name` without advancing it.
pub fn peek(conn: &Connection, name: &str) -> RepoResult<i64> {
    conn.query_row(
        "SELECT next_value FROM sequences WHERE name = ?1;",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .optional()?
    .ok_or_else(|| RepoError::MissingSequence(name.to_string()))
}

/// Moves sequence `name` past an explicitly inserted `id`.
///
/// Never moves the sequence backwards.
pub fn advance_past(conn: &Connection, name: &str, id: i64) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE sequences SET next_value = MAX(next_value, ?2 + 1) WHERE name = ?1;",
        params![name, id],
    )?;
    if changed == 0 {
        return Err(RepoError::MissingSequence(name.to_string()));
    }
    Ok(())
}

/// Resets sequence `name` to `max(id) + 1` over the rows of `table`.
///
/// `table` must be a trusted identifier.
pub fn resync(conn: &Connection, table: &str, name: &str) -> RepoResult<i64> {
    let started_at = Instant::now();
    let sql = format!(
        "UPDATE sequences
         SET next_value = (SELECT COALESCE(MAX(id), 0) + 1 FROM {table})
         WHERE name = ?1
         RETURNING next_value;"
    );
    let next = conn
        .query_row(&sql, [name], |row| row.get::<_, i64>(0))
        .optional()?
        .ok_or_else(|| RepoError::MissingSequence(name.to_string()))?;

    info!(
        "event=sequence_resync module=sequence status=ok sequence={name} next_value={next} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(next)
}

/// Lists every registered sequence ordered by name.
pub fn list(conn: &Connection) -> RepoResult<Vec<SequenceState>> {
    let mut stmt = conn.prepare(
        "SELECT name, table_name, next_value FROM sequences ORDER BY name ASC;",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(SequenceState {
            name: row.get(0)?,
            table_name: row.get(1)?,
            next_value: row.get(2)?,
        })
    })?;

    let mut states = Vec::new();
    for row in rows {
        states.push(row?);
    }
    Ok(states)
}

/// Resynchronizes the sequence registered for `table`.
///
/// The table name is resolved through the `sequences` registry before it
/// reaches any SQL text.
pub fn resync_table(conn: &Connection, table: &str) -> RepoResult<SequenceState> {
    let state = list(conn)?
        .into_iter()
        .find(|state| state.table_name == table)
        .ok_or_else(|| RepoError::MissingSequence(format!("{table}_seq")))?;
    let next_value = resync(conn, &state.table_name, &state.name)?;
    Ok(SequenceState { next_value, ..state })
}

/// Resynchronizes every registered sequence.
pub fn resync_all(conn: &Connection) -> RepoResult<Vec<SequenceState>> {
    let mut states = list(conn)?;
    for state in &mut states {
        state.next_value = resync(conn, &state.table_name, &state.name)?;
    }
    Ok(states)
}
