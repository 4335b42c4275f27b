//! The caller-facing session: one logical database session over a lazily created connection.

mod procedure;

use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub use procedure::ProcedureSession;

use crate::connection::Connection;
use crate::connection_string::ConnectionIdentity;
use crate::conversion::{FromValue, convert_scalar};
use crate::error::SqlSessionError;
use crate::factory::ConnectionFactory;
use crate::messages::{MessageDispatcher, MessageSink, ServerMessage};
use crate::parameter::ParameterSet;
use crate::resources::{ScriptStore, read_file};
use crate::results::{Rows, ValueSet};
use crate::types::{CommandKind, Value};

/// A database session.
///
/// No connection exists until the first statement runs. [`Session::close_connection`] drops
/// the connection (rolling back any open transaction); the next statement creates a new one.
///
/// A session is meant to be used from one thread at a time; the connection it creates may be
/// shared more freely.
///
/// ```rust,no_run
/// use sql_session::prelude::*;
///
/// # fn main() -> Result<(), SqlSessionError> {
/// let mut session = Session::sqlite("Data Source=app.db")?;
/// session.execute("create table if not exists t (Id int, Value int)", None)?;
/// session.execute_on_transaction(
///     "insert into t values(@Id, @Value)",
///     Some(&ParameterSet::new().with("Id", 1).with("Value", 5)),
/// )?;
/// session.commit()?;
/// let total: i64 = session.get_scalar_as("select sum(Value) from t", None)?;
/// # let _ = total;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    factory: Arc<dyn ConnectionFactory>,
    connection_string: String,
    connection: Option<Box<dyn Connection>>,
    messages: MessageSink,
    identity: OnceLock<ConnectionIdentity>,
    command_timeout: Option<Duration>,
    scripts: Option<ScriptStore>,
}

impl Session {
    /// A session whose connections come from `factory`.
    pub fn new(factory: impl ConnectionFactory + 'static, connection_string: impl Into<String>) -> Self {
        Self::with_factory(Arc::new(factory), connection_string)
    }

    /// Like [`Session::new`], sharing a factory between sessions.
    pub fn with_factory(
        factory: Arc<dyn ConnectionFactory>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            factory,
            connection_string: connection_string.into(),
            connection: None,
            messages: MessageDispatcher::new(),
            identity: OnceLock::new(),
            command_timeout: None,
            scripts: None,
        }
    }

    /// A `SQLite` session. The connection string is validated now; the file is opened on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the connection string is unusable.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(connection_string: impl Into<String>) -> Result<Self, SqlSessionError> {
        let connection_string = connection_string.into();
        crate::sqlite::SqliteOptions::parse(&connection_string)?;
        Ok(Self::new(crate::sqlite::SqliteFactory, connection_string))
    }

    /// A `PostgreSQL` session. The connection string is validated now; the server is contacted
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the connection string is unusable.
    #[cfg(feature = "postgres")]
    pub fn postgres(connection_string: impl Into<String>) -> Result<Self, SqlSessionError> {
        let connection_string = connection_string.into();
        crate::postgres::PostgresOptions::parse(&connection_string)?;
        Ok(Self::new(crate::postgres::PostgresFactory, connection_string))
    }

    /// Attach embedded scripts and resource bundles for [`Session::read_embedded`] and
    /// [`Session::read_resource`].
    #[must_use]
    pub fn with_scripts(mut self, scripts: ScriptStore) -> Self {
        self.scripts = Some(scripts);
        self
    }

    /// Default timeout for [`Session::execute`]; `None` or zero means no limit.
    pub fn set_command_timeout(&mut self, timeout: Option<Duration>) {
        self.command_timeout = timeout.filter(|t| !t.is_zero());
    }

    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }

    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Whether a connection currently exists. It may not have been opened yet.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// The current connection, created through the factory if there is none.
    ///
    /// # Errors
    ///
    /// Returns the factory's error if the connection cannot be created.
    pub fn ensure_connection(&mut self) -> Result<&dyn Connection, SqlSessionError> {
        if self.connection.is_none() {
            tracing::debug!("creating connection");
            let connection = self
                .factory
                .create(&self.connection_string, Arc::clone(&self.messages))?;
            self.connection = Some(connection);
        }
        self.connection.as_deref().ok_or_else(|| {
            SqlSessionError::ConnectionError("connection was not created".into())
        })
    }

    /// Run a query and read all of its rows.
    ///
    /// # Errors
    ///
    /// Returns the driver's error, or the first error met while reading rows.
    pub fn select(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<Vec<ValueSet>, SqlSessionError> {
        self.select_rows(sql, parameters)?.collect()
    }

    /// Run a query and return its rows lazily.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if the query cannot be started.
    pub fn select_rows(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<Rows, SqlSessionError> {
        self.ensure_connection()?.select(sql, parameters)
    }

    /// Run a statement once, outside any transaction, with the session's command timeout.
    ///
    /// # Errors
    ///
    /// Returns the driver's error; `Timeout` if the command timeout elapsed.
    pub fn execute(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<(), SqlSessionError> {
        let timeout = self.command_timeout;
        self.execute_with_timeout(sql, parameters, timeout)
    }

    /// Run a statement once with an explicit timeout; `None` or zero means no limit.
    ///
    /// # Errors
    ///
    /// Returns the driver's error; `Timeout` if `timeout` elapsed.
    pub fn execute_with_timeout(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        timeout: Option<Duration>,
    ) -> Result<(), SqlSessionError> {
        self.run(sql, parameters, CommandKind::Text, timeout)
    }

    /// Run a statement once per parameter set, all inside one transaction of its own.
    ///
    /// # Errors
    ///
    /// Returns the first failure; none of the batch is committed then.
    pub fn execute_batch(
        &mut self,
        sql: &str,
        parameter_sets: &[ParameterSet],
    ) -> Result<(), SqlSessionError> {
        self.run_batch(sql, parameter_sets, CommandKind::Text)
    }

    /// Run a statement on the session's transaction, beginning one if needed.
    ///
    /// # Errors
    ///
    /// Returns the driver's error. The transaction stays open.
    pub fn execute_on_transaction(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<(), SqlSessionError> {
        self.run_on_transaction(sql, parameters, CommandKind::Text)
    }

    /// Run a statement once per parameter set on the session's transaction.
    ///
    /// # Errors
    ///
    /// Returns the first failure. The transaction stays open.
    pub fn execute_batch_on_transaction(
        &mut self,
        sql: &str,
        parameter_sets: &[ParameterSet],
    ) -> Result<(), SqlSessionError> {
        self.run_batch_on_transaction(sql, parameter_sets, CommandKind::Text)
    }

    /// First column of the first row, or `None` if the query returns no row.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    pub fn get_scalar(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<Option<Value>, SqlSessionError> {
        self.ensure_connection()?.get_scalar(sql, parameters)
    }

    /// [`Session::get_scalar`] converted to `T`. No row converts like NULL, so ask for an
    /// `Option<T>` when the query may return nothing.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConversionError` if the value cannot be converted.
    pub fn get_scalar_as<T: FromValue>(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
    ) -> Result<T, SqlSessionError> {
        convert_scalar(self.get_scalar(sql, parameters)?)
    }

    /// Commit the session's transaction. Does nothing if no connection exists.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    pub fn commit(&mut self) -> Result<(), SqlSessionError> {
        match &self.connection {
            Some(connection) => connection.commit(),
            None => Ok(()),
        }
    }

    /// Roll back the session's transaction. Does nothing if no connection exists.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    pub fn rollback(&mut self) -> Result<(), SqlSessionError> {
        match &self.connection {
            Some(connection) => connection.rollback(),
            None => Ok(()),
        }
    }

    /// Dispose of the connection, if any. An open transaction is rolled back and lost.
    pub fn close_connection(&mut self) {
        if let Some(connection) = self.connection.take() {
            tracing::debug!("closing connection");
            connection.dispose();
        }
    }

    /// Same as [`Session::close_connection`]; the session stays usable.
    pub fn dispose(&mut self) {
        self.close_connection();
    }

    /// Database named by the connection string.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if the connection string names none.
    pub fn database(&self) -> Result<&str, SqlSessionError> {
        Ok(&self.identity()?.database)
    }

    /// Server (or file, for `SQLite`) named by the connection string.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if the connection string names none.
    pub fn server(&self) -> Result<&str, SqlSessionError> {
        Ok(&self.identity()?.server)
    }

    fn identity(&self) -> Result<&ConnectionIdentity, SqlSessionError> {
        if let Some(identity) = self.identity.get() {
            return Ok(identity);
        }
        let identity = self.factory.identity(&self.connection_string)?;
        Ok(self.identity.get_or_init(|| identity))
    }

    /// Register a handler for informational server messages.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.messages.on_message(handler);
    }

    /// Register a handler for server messages at error severity or above.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.messages.on_error(handler);
    }

    /// Embedded script registered under `path`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if there is no such script.
    pub fn read_embedded(&self, path: &str) -> Result<String, SqlSessionError> {
        self.script_store(path)?.read_embedded(path)
    }

    /// Item `key` of the resource bundle `path`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if the bundle or the item is missing.
    pub fn read_resource(&self, path: &str, key: &str) -> Result<String, SqlSessionError> {
        match &self.scripts {
            Some(scripts) => scripts.read_resource(path, key),
            None => Err(SqlSessionError::NotFound(format!(
                "Resource file '{path}' couldn't be found."
            ))),
        }
    }

    /// Contents of a file on disk.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if the file does not exist.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<String, SqlSessionError> {
        read_file(path)
    }

    fn script_store(&self, path: &str) -> Result<&ScriptStore, SqlSessionError> {
        self.scripts.as_ref().ok_or_else(|| {
            SqlSessionError::NotFound(format!("Resource script '{path}' couldn't be found."))
        })
    }

    pub(crate) fn run(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> Result<(), SqlSessionError> {
        self.ensure_connection()?
            .execute(sql, parameters, kind, timeout)
    }

    pub(crate) fn run_batch(
        &mut self,
        sql: &str,
        parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.ensure_connection()?
            .execute_batch(sql, parameter_sets, kind)
    }

    pub(crate) fn run_on_transaction(
        &mut self,
        sql: &str,
        parameters: Option<&ParameterSet>,
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.ensure_connection()?
            .execute_on_transaction(sql, parameters, kind)
    }

    pub(crate) fn run_batch_on_transaction(
        &mut self,
        sql: &str,
        parameter_sets: &[ParameterSet],
        kind: CommandKind,
    ) -> Result<(), SqlSessionError> {
        self.ensure_connection()?
            .execute_batch_on_transaction(sql, parameter_sets, kind)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close_connection();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("has_connection", &self.connection.is_some())
            .field("command_timeout", &self.command_timeout)
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}
