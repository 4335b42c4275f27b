//! The contract a database driver fulfils for [`DbConnection`](crate::connection::DbConnection).
//!
//! A driver owns one physical connection and knows how to run a command on it. It keeps no
//! transaction state of its own: the connection hands the current transaction back on every
//! call, and is the only caller, always under its lock.

use std::time::Duration;

use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::results::RowReader;
use crate::types::{CommandKind, Value};

/// One statement to run: SQL text (or a procedure name), its kind, parameters and timeout.
#[derive(Debug, Clone, Copy)]
pub struct Command<'a> {
    pub sql: &'a str,
    pub kind: CommandKind,
    pub parameters: Option<&'a ParameterSet>,
    /// `None` means no limit.
    pub timeout: Option<Duration>,
}

impl<'a> Command<'a> {
    #[must_use]
    pub fn text(sql: &'a str, parameters: Option<&'a ParameterSet>) -> Self {
        Self {
            sql,
            kind: CommandKind::Text,
            parameters,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the timeout; a zero duration means no limit.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// The same statement bound to another parameter set.
    #[must_use]
    pub fn rebind(mut self, parameters: &'a ParameterSet) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// A physical database connection.
pub trait Driver: Send {
    /// Handle to an open transaction. Returned by `begin`, consumed by `commit`/`rollback`.
    type Transaction: Send;

    /// Open the physical connection. Only called when `is_open` returns `false`.
    ///
    /// # Errors
    /// Returns the driver's error if the connection cannot be established.
    fn open(&mut self) -> Result<(), SqlSessionError>;

    fn is_open(&self) -> bool;

    /// Start a transaction on the open connection.
    ///
    /// # Errors
    /// Returns the driver's error if the transaction cannot be started.
    fn begin(&mut self) -> Result<Self::Transaction, SqlSessionError>;

    /// # Errors
    /// Returns the driver's error if the commit fails.
    fn commit(&mut self, transaction: Self::Transaction) -> Result<(), SqlSessionError>;

    /// # Errors
    /// Returns the driver's error if the rollback fails.
    fn rollback(&mut self, transaction: Self::Transaction) -> Result<(), SqlSessionError>;

    /// Run a non-query statement once; returns the affected row count.
    ///
    /// # Errors
    /// Returns the driver's error, or a binding error for the parameters.
    fn execute(
        &mut self,
        command: &Command<'_>,
        transaction: Option<&Self::Transaction>,
    ) -> Result<u64, SqlSessionError>;

    /// Run `command` once per parameter set, preparing it once and rebinding values.
    ///
    /// # Errors
    /// Stops at, and returns, the first failure.
    fn execute_many(
        &mut self,
        command: &Command<'_>,
        parameter_sets: &[ParameterSet],
        transaction: Option<&Self::Transaction>,
    ) -> Result<(), SqlSessionError>;

    /// Start a query and return a reader over its rows.
    ///
    /// The reader must not borrow the driver: rows are consumed after the connection lock
    /// has been released.
    ///
    /// # Errors
    /// Returns the driver's error if the query cannot be started.
    fn query(&mut self, command: &Command<'_>) -> Result<Box<dyn RowReader>, SqlSessionError>;

    /// First column of the first row, or `None` when there is no row.
    ///
    /// # Errors
    /// Returns the driver's error if the query fails.
    fn scalar(&mut self, command: &Command<'_>) -> Result<Option<Value>, SqlSessionError>;

    /// Close the physical connection. Closing a closed driver is a no-op.
    ///
    /// # Errors
    /// Returns the driver's error if closing fails; the connection counts as closed anyway.
    fn close(&mut self) -> Result<(), SqlSessionError>;
}
