use crate::driver::{Command, Driver};
use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::results::Rows;
use crate::types::Value;

use super::state::DbConnection;

impl<D: Driver> DbConnection<D> {
    /// Start the query under the lock; rows are then pulled without holding it.
    pub(super) fn select_rows(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<Rows, SqlSessionError> {
        let command = Command::text(sql, parameters);
        let reader = {
            let mut state = self.lock();
            let driver = state.ensure_open()?;
            tracing::trace!(sql, "select");
            driver.query(&command)?
        };
        Ok(Rows::new(reader))
    }

    pub(super) fn scalar(
        &self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<Option<Value>, SqlSessionError> {
        let command = Command::text(sql, parameters);
        let mut state = self.lock();
        let driver = state.ensure_open()?;
        tracing::trace!(sql, "scalar");
        driver.scalar(&command)
    }
}
