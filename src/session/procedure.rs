use std::ops::{Deref, DerefMut};

use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::types::CommandKind;

use super::Session;

/// A [`Session`] whose execute verbs call stored procedures by name.
///
/// Everything else (queries, scalars, commit, close) is the wrapped session's, reachable
/// through `Deref`.
///
/// ```rust,no_run
/// use sql_session::prelude::*;
///
/// # fn main() -> Result<(), SqlSessionError> {
/// # #[cfg(feature = "postgres")] {
/// let mut session = ProcedureSession::new(Session::postgres("postgres://u:p@localhost/app")?);
/// session.execute_procedure(
///     "app.set_value",
///     Some(&ParameterSet::new().with("Id", 1).with("Value", 5)),
/// )?;
/// # }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ProcedureSession {
    session: Session,
}

impl ProcedureSession {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn into_inner(self) -> Session {
        self.session
    }

    /// Call `procedure` once, outside any transaction, with the session's command timeout.
    ///
    /// # Errors
    ///
    /// Returns the driver's error; `Unimplemented` for a backend without procedures.
    pub fn execute_procedure(
        &mut self,
        procedure: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<(), SqlSessionError> {
        let timeout = self.session.command_timeout();
        self.session
            .run(procedure, parameters, CommandKind::StoredProcedure, timeout)
    }

    /// Call `procedure` once per parameter set inside one transaction of its own.
    ///
    /// # Errors
    ///
    /// Returns the first failure; none of the batch is committed then.
    pub fn execute_procedure_batch(
        &mut self,
        procedure: &str,
        parameter_sets: &[ParameterSet],
    ) -> Result<(), SqlSessionError> {
        self.session
            .run_batch(procedure, parameter_sets, CommandKind::StoredProcedure)
    }

    /// Call `procedure` on the session's transaction, beginning one if needed.
    ///
    /// # Errors
    ///
    /// Returns the driver's error. The transaction stays open.
    pub fn execute_procedure_on_transaction(
        &mut self,
        procedure: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<(), SqlSessionError> {
        self.session
            .run_on_transaction(procedure, parameters, CommandKind::StoredProcedure)
    }

    /// Call `procedure` once per parameter set on the session's transaction.
    ///
    /// # Errors
    ///
    /// Returns the first failure. The transaction stays open.
    pub fn execute_procedure_batch_on_transaction(
        &mut self,
        procedure: &str,
        parameter_sets: &[ParameterSet],
    ) -> Result<(), SqlSessionError> {
        self.session.run_batch_on_transaction(
            procedure,
            parameter_sets,
            CommandKind::StoredProcedure,
        )
    }
}

impl From<Session> for ProcedureSession {
    fn from(session: Session) -> Self {
        Self::new(session)
    }
}

impl Deref for ProcedureSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for ProcedureSession {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}
