use crate::driver::{Command, Driver};
use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::types::CommandKind;

use super::state::{DbConnection, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Outcome {
    Commit,
    Rollback,
}

impl<D: Driver> State<D> {
    /// Open the connection and begin the explicit transaction unless one is already active.
    fn ensure_transaction(&mut self) -> Result<(), SqlSessionError> {
        if self.transaction.is_some() {
            if self.driver.is_open() {
                return Ok(());
            }
            // A reopened link would run in autocommit; forget the token so the next call
            // begins afresh.
            self.transaction = None;
            tracing::warn!("transaction lost: connection was closed");
            return Err(SqlSessionError::ConnectionError(
                "transaction lost: connection was closed".into(),
            ));
        }
        let driver = self.ensure_open()?;
        let transaction = driver.begin()?;
        tracing::debug!("transaction started");
        self.transaction = Some(transaction);
        Ok(())
    }
}

impl<D: Driver> DbConnection<D> {
    pub(super) fn execute_in_transaction(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        let mut state = self.lock();
        state.ensure_transaction()?;
        let command = Command::text(sql, parameters).with_kind(kind);
        tracing::trace!(sql, ?kind, "execute on transaction");
        let State {
            driver,
            transaction,
            ..
        } = &mut *state;
        driver.execute(&command, transaction.as_ref())?;
        Ok(())
    }

    pub(super) fn execute_batch_in_transaction(
        &self,
        sql: &str,
        parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        if parameter_sets.is_empty() {
            return Ok(());
        }
        let mut state = self.lock();
        state.ensure_transaction()?;
        let command = Command::text(sql, None).with_kind(kind);
        tracing::trace!(sql, ?kind, sets = parameter_sets.len(), "batch on transaction");
        let State {
            driver,
            transaction,
            ..
        } = &mut *state;
        driver.execute_many(&command, parameter_sets, transaction.as_ref())
    }

    /// Commit or roll back the explicit transaction, if any, and release it.
    pub(super) fn end_transaction(&self, outcome: Outcome) -> Result<(), SqlSessionError> {
        let mut state = self.lock();
        let Some(transaction) = state.transaction.take() else {
            return Ok(());
        };
        tracing::debug!(?outcome, "ending transaction");
        match outcome {
            Outcome::Commit => state.driver.commit(transaction),
            Outcome::Rollback => state.driver.rollback(transaction),
        }
    }
}
