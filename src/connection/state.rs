use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::driver::Driver;
use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::results::Rows;
use crate::types::{CommandKind, Value};

use super::Connection;
use super::tx::Outcome;

/// [`Connection`] implementation over a [`Driver`].
pub struct DbConnection<D: Driver> {
    state: Mutex<State<D>>,
}

pub(super) struct State<D: Driver> {
    pub(super) driver: D,
    pub(super) transaction: Option<D::Transaction>,
    disposed: bool,
}

impl<D: Driver> State<D> {
    /// Open the driver if needed and hand it out. Fails once the connection is disposed.
    pub(super) fn ensure_open(&mut self) -> Result<&mut D, SqlSessionError> {
        if self.disposed {
            return Err(SqlSessionError::Disposed);
        }
        if !self.driver.is_open() {
            tracing::debug!("opening physical connection");
            self.driver.open()?;
        }
        Ok(&mut self.driver)
    }
}

impl<D: Driver> DbConnection<D> {
    /// Wrap a driver. Nothing is opened until the first statement.
    pub fn new(driver: D) -> Self {
        Self {
            state: Mutex::new(State {
                driver,
                transaction: None,
                disposed: false,
            }),
        }
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, State<D>> {
        // A panic inside a driver call must not wedge teardown; keep using the state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an explicit transaction is currently active.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.lock().transaction.is_some()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    fn dispose_state(&self) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        tracing::debug!(
            in_transaction = state.transaction.is_some(),
            "disposing connection"
        );

        if let Some(transaction) = state.transaction.take()
            && let Err(err) = state.driver.rollback(transaction)
        {
            tracing::warn!("rollback during dispose failed: {err}");
        }

        if state.driver.is_open()
            && let Err(err) = state.driver.close()
        {
            tracing::warn!("closing connection during dispose failed: {err}");
        }

        state.disposed = true;
    }
}

impl<D: Driver> Connection for DbConnection<D> {
    fn select(&self, sql: &str, parameters: Option<&ParameterSet>) -> Result<Rows, SqlSessionError> {
        self.select_rows(sql, parameters)
    }

    fn execute(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> Result<(), SqlSessionError> {
        self.execute_once(sql, parameters, kind, timeout)
    }

    fn execute_batch(
        &self,
        sql: &str,
        parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.execute_adhoc_batch(sql, parameter_sets, kind)
    }

    fn execute_on_transaction(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.execute_in_transaction(sql, parameters, kind)
    }

    fn execute_batch_on_transaction(
        &self,
        sql: &str,
        parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.execute_batch_in_transaction(sql, parameter_sets, kind)
    }

    fn get_scalar(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<Option<Value>, SqlSessionError> {
        self.scalar(sql, parameters)
    }

    fn commit(&self) -> Result<(), SqlSessionError> {
        self.end_transaction(Outcome::Commit)
    }

    fn rollback(&self) -> Result<(), SqlSessionError> {
        self.end_transaction(Outcome::Rollback)
    }

    fn dispose(&self) {
        self.dispose_state();
    }
}

impl<D: Driver> Drop for DbConnection<D> {
    fn drop(&mut self) {
        self.dispose_state();
    }
}

impl<D: Driver> fmt::Debug for DbConnection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("DbConnection")
            .field("open", &state.driver.is_open())
            .field("in_transaction", &state.transaction.is_some())
            .field("disposed", &state.disposed)
            .finish()
    }
}
