use std::time::Duration;

use crate::driver::{Command, Driver};
use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::types::CommandKind;

use super::state::DbConnection;

impl<D: Driver> DbConnection<D> {
    pub(super) fn execute_once(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> Result<(), SqlSessionError> {
        let command = Command::text(sql, parameters)
            .with_kind(kind)
            .with_timeout(timeout);
        let mut state = self.lock();
        let driver = state.ensure_open()?;
        tracing::trace!(sql, ?kind, ?timeout, "execute");
        driver.execute(&command, None)?;
        Ok(())
    }

    /// Run the batch inside its own transaction, committed only when every set succeeded.
    pub(super) fn execute_adhoc_batch(
        &self,
        sql: &str,
        parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        if parameter_sets.is_empty() {
            return Ok(());
        }

        let mut state = self.lock();
        if state.transaction.is_some() {
            return Err(SqlSessionError::ExecutionError(
                "cannot run a batch while an explicit transaction is active; use execute_batch_on_transaction".into(),
            ));
        }

        let driver = state.ensure_open()?;
        let command = Command::text(sql, None).with_kind(kind);
        tracing::trace!(sql, ?kind, sets = parameter_sets.len(), "batch");

        let transaction = driver.begin()?;
        match driver.execute_many(&command, parameter_sets, Some(&transaction)) {
            Ok(()) => driver.commit(transaction),
            Err(err) => {
                if let Err(rollback_err) = driver.rollback(transaction) {
                    tracing::warn!("rollback of failed batch failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }
}
