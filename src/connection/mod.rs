//! A connection owns one physical database connection and at most one active transaction.
//!
//! [`Connection`] is the seam a [`Session`](crate::session::Session) talks to and the one a
//! test double replaces. [`DbConnection`] is its implementation over any [`Driver`](crate::driver::Driver): it opens
//! the driver lazily, keeps the explicit transaction alive across calls until `commit` or
//! `rollback`, wraps each batch in its own ad-hoc transaction, and serializes every state
//! transition behind a single mutex.

mod state;
mod dml;
mod select;
mod tx;

use std::time::Duration;

pub use state::DbConnection;

use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::results::Rows;
use crate::types::{CommandKind, Value};

/// Statement execution over one database connection.
///
/// Implementations may be shared between threads; every method takes `&self`.
pub trait Connection: Send + Sync {
    /// Run a read query and return its rows lazily.
    ///
    /// The connection lock is released before the first row is handed out. Postgres pulls
    /// rows from the server as the caller advances; SQLite reads the whole result while the
    /// lock is held, because a rusqlite statement borrows its connection.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be opened or the query cannot be started.
    fn select(&self, sql: &str, parameters: Option<&ParameterSet>) -> Result<Rows, SqlSessionError>;

    /// Run a statement once, outside any transaction.
    ///
    /// # Errors
    /// Returns the driver's error; `Timeout` if `timeout` elapsed.
    fn execute(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> Result<(), SqlSessionError>;

    /// Run a statement once per parameter set inside one ad-hoc transaction that is committed
    /// as a unit. An empty slice is a no-op.
    ///
    /// # Errors
    /// Returns the first failure; nothing from the batch is committed in that case.
    fn execute_batch(
        &self,
        sql: &str,
        parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError>;

    /// Run a statement on the connection's transaction, beginning one if none is active.
    /// The transaction stays open until `commit` or `rollback`.
    ///
    /// # Errors
    /// Returns the driver's error. The transaction stays open after a failure.
    fn execute_on_transaction(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        kind: CommandKind,
    ) -> Result<(), SqlSessionError>;

    /// Run a statement once per parameter set on the connection's transaction, beginning one if
    /// none is active. An empty slice is a no-op.
    ///
    /// # Errors
    /// Returns the first failure. The transaction stays open after a failure.
    fn execute_batch_on_transaction(
        &self,
        sql: &str,
        parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError>;

    /// First column of the first row, or `None` when the query returns no row.
    ///
    /// # Errors
    /// Returns the driver's error.
    fn get_scalar(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<Option<Value>, SqlSessionError>;

    /// Commit the current transaction; a no-op when none is active.
    ///
    /// # Errors
    /// Returns the driver's error. The transaction is released either way.
    fn commit(&self) -> Result<(), SqlSessionError>;

    /// Roll back the current transaction; a no-op when none is active.
    ///
    /// # Errors
    /// Returns the driver's error. The transaction is released either way.
    fn rollback(&self) -> Result<(), SqlSessionError>;

    /// Roll back any open transaction and close the physical connection. Never fails;
    /// calling it again is a no-op.
    fn dispose(&self);
}
