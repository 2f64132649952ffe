//! Unit-of-work boundaries over a shared SQLite connection.
//!
//! # Responsibility
//! - Run caller work inside one IMMEDIATE transaction with commit/rollback.
//! - Provide nested savepoints for multi-statement repository operations.
//!
//! # Invariants
//! - A committed unit of work is consumed and can never be rolled back.
//! - Work that returns `Err` or panics is rolled back before control leaves.
//! - Savepoints nest inside an outer transaction; outermost release commits.

use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Runs `work` inside one transaction bound to `conn`.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`.
/// A panic inside `work` unwinds through the transaction guard, which rolls
/// back on drop before the panic continues.
///
/// Must not be called while `conn` already has an open transaction; nested
/// atomic sections use [`Savepoint`] instead.
///
/// # Errors
/// - Returns `E::from(rusqlite::Error)` when begin or commit fails.
/// - Returns the error produced by `work` unchanged.
pub fn in_transaction<T, E, F>(conn: &Connection, work: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    match work(&tx) {
        Ok(value) => {
            tx.commit()?;
            info!("event=uow_commit module=uow status=ok");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!("event=uow_rollback module=uow status=error error={rollback_err}");
            } else {
                info!("event=uow_rollback module=uow status=ok");
            }
            Err(err)
        }
    }
}

/// Named SQLite savepoint guard over a shared connection borrow.
///
/// Rolls back to the savepoint when dropped without [`Savepoint::release`].
pub struct Savepoint<'c> {
    conn: &'c Connection,
    name: &'static str,
    released: bool,
}

impl<'c> Savepoint<'c> {
    /// Opens savepoint `name` on `conn`.
    ///
    /// `name` must be a plain SQL identifier.
    pub fn begin(conn: &'c Connection, name: &'static str) -> rusqlite::Result<Self> {
        conn.execute_batch(&format!("SAVEPOINT {name};"))?;
        Ok(Self {
            conn,
            name,
            released: false,
        })
    }

    /// Returns the connection this savepoint runs on.
    pub fn conn(&self) -> &'c Connection {
        self.conn
    }

    /// Releases the savepoint, keeping its changes.
    pub fn release(mut self) -> rusqlite::Result<()> {
        self.conn.execute_batch(&format!("RELEASE {};", self.name))?;
        self.released = true;
        Ok(())
    }
}

impl Drop for Savepoint<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let sql = format!("ROLLBACK TO {name}; RELEASE {name};", name = self.name);
        if let Err(err) = self.conn.execute_batch(&sql) {
            warn!(
                "event=savepoint_rollback module=uow status=error savepoint={} error={err}",
                self.name
            );
        }
    }
}
