use std::time::Duration;

use rusqlite::ErrorCode;

use crate::driver::{Command, Driver};
use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::results::{BufferedRows, RowReader};
use crate::translation::translate_named_placeholders;
use crate::types::{CommandKind, Value};

use super::config::SqliteOptions;
use super::params::bind_named;
use super::query::{read_rows, read_scalar};

/// rusqlite's busy timeout for a freshly opened connection.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Token for the transaction begun on a [`SqliteDriver`].
///
/// `SQLite` has one transaction per connection, so the token carries no handle; the id only
/// shows up in logs.
#[derive(Debug)]
pub struct SqliteTransaction {
    id: u64,
}

/// [`Driver`] over a single rusqlite connection.
#[derive(Debug)]
pub struct SqliteDriver {
    options: SqliteOptions,
    conn: Option<rusqlite::Connection>,
    next_transaction: u64,
}

impl SqliteDriver {
    #[must_use]
    pub fn new(options: SqliteOptions) -> Self {
        Self {
            options,
            conn: None,
            next_transaction: 1,
        }
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    fn connection(&self) -> Result<&rusqlite::Connection, SqlSessionError> {
        self.conn.as_ref().ok_or_else(|| {
            SqlSessionError::ConnectionError("SQLite connection is not open".into())
        })
    }

    /// Run `work` with the command's timeout applied as the busy timeout, then restore the
    /// configured one. A busy failure under a timeout is reported as `Timeout`.
    fn with_timeout<T>(
        &self,
        timeout: Option<Duration>,
        work: impl FnOnce(&rusqlite::Connection) -> Result<T, SqlSessionError>,
    ) -> Result<T, SqlSessionError> {
        let conn = self.connection()?;
        let Some(limit) = timeout else {
            return work(conn);
        };

        conn.busy_timeout(limit)?;
        let result = work(conn);
        let configured = self.options.busy_timeout.unwrap_or(DEFAULT_BUSY_TIMEOUT);
        if let Err(err) = conn.busy_timeout(configured) {
            tracing::warn!("restoring SQLite busy timeout failed: {err}");
        }

        result.map_err(|err| match err {
            SqlSessionError::SqliteError(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::DatabaseBusy =>
            {
                SqlSessionError::Timeout(limit)
            }
            other => other,
        })
    }
}

fn reject_procedure(command: &Command<'_>) -> Result<(), SqlSessionError> {
    match command.kind {
        CommandKind::Text => Ok(()),
        CommandKind::StoredProcedure => Err(SqlSessionError::Unimplemented(format!(
            "SQLite has no stored procedures; cannot call '{}'",
            command.sql
        ))),
    }
}

/// Without parameters a command may be a multi-statement script, but it must not expect any.
fn check_script(sql: &str) -> Result<(), SqlSessionError> {
    let statement = translate_named_placeholders(sql, |name, _| name.to_string());
    match statement.names.first() {
        Some(name) => Err(SqlSessionError::ParameterError(format!(
            "no value supplied for placeholder '@{name}'"
        ))),
        None => Ok(()),
    }
}

impl Driver for SqliteDriver {
    type Transaction = SqliteTransaction;

    fn open(&mut self) -> Result<(), SqlSessionError> {
        let conn = rusqlite::Connection::open(&self.options.db_path)?;
        if let Some(timeout) = self.options.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if self.options.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        tracing::debug!(db_path = %self.options.db_path, "SQLite connection opened");
        self.conn = Some(conn);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn begin(&mut self) -> Result<SqliteTransaction, SqlSessionError> {
        self.connection()?.execute_batch("BEGIN")?;
        let transaction = SqliteTransaction {
            id: self.next_transaction,
        };
        self.next_transaction += 1;
        tracing::trace!(id = transaction.id, "BEGIN");
        Ok(transaction)
    }

    fn commit(&mut self, transaction: SqliteTransaction) -> Result<(), SqlSessionError> {
        let conn = self.connection()?;
        tracing::trace!(id = transaction.id, "COMMIT");
        if let Err(err) = conn.execute_batch("COMMIT") {
            // A failed COMMIT can leave the transaction open.
            if !conn.is_autocommit()
                && let Err(rollback_err) = conn.execute_batch("ROLLBACK")
            {
                tracing::warn!("rollback after failed commit failed: {rollback_err}");
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn rollback(&mut self, transaction: SqliteTransaction) -> Result<(), SqlSessionError> {
        let conn = self.connection()?;
        tracing::trace!(id = transaction.id, "ROLLBACK");
        // SQLite may already have rolled back on its own after some errors.
        if conn.is_autocommit() {
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn execute(
        &mut self,
        command: &Command<'_>,
        _transaction: Option<&SqliteTransaction>,
    ) -> Result<u64, SqlSessionError> {
        reject_procedure(command)?;
        let parameters = command.parameters.filter(|set| !set.is_empty());
        self.with_timeout(command.timeout, |conn| match parameters {
            None => {
                check_script(command.sql)?;
                conn.execute_batch(command.sql)?;
                Ok(u64::try_from(conn.changes()).unwrap_or(u64::MAX))
            }
            Some(parameters) => {
                let mut stmt = conn.prepare(command.sql)?;
                bind_named(&mut stmt, Some(parameters))?;
                Ok(stmt.raw_execute()? as u64)
            }
        })
    }

    fn execute_many(
        &mut self,
        command: &Command<'_>,
        parameter_sets: &[ParameterSet],
        _transaction: Option<&SqliteTransaction>,
    ) -> Result<(), SqlSessionError> {
        reject_procedure(command)?;
        self.with_timeout(command.timeout, |conn| {
            let mut stmt = conn.prepare(command.sql)?;
            for parameters in parameter_sets {
                bind_named(&mut stmt, Some(parameters))?;
                stmt.raw_execute()?;
            }
            Ok(())
        })
    }

    /// Buffers the result: the statement cannot outlive the borrow of the connection.
    fn query(&mut self, command: &Command<'_>) -> Result<Box<dyn RowReader>, SqlSessionError> {
        reject_procedure(command)?;
        let rows = self.with_timeout(command.timeout, |conn| {
            let mut stmt = conn.prepare(command.sql)?;
            bind_named(&mut stmt, command.parameters)?;
            read_rows(&mut stmt)
        })?;
        Ok(Box::new(BufferedRows::new(rows)))
    }

    fn scalar(&mut self, command: &Command<'_>) -> Result<Option<Value>, SqlSessionError> {
        reject_procedure(command)?;
        self.with_timeout(command.timeout, |conn| {
            let mut stmt = conn.prepare(command.sql)?;
            bind_named(&mut stmt, command.parameters)?;
            read_scalar(&mut stmt)
        })
    }

    fn close(&mut self) -> Result<(), SqlSessionError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        tracing::debug!(db_path = %self.options.db_path, "SQLite connection closed");
        conn.close().map_err(|(_, err)| err.into())
    }
}
