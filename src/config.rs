use std::time::Duration;

use crate::error::SqlSessionError;
use crate::session::Session;
use crate::types::DatabaseType;

/// Everything needed to build a [`Session`] for one of the bundled backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub database_type: DatabaseType,
    pub connection_string: String,
    /// Default timeout for `execute`; `None` means no limit.
    pub command_timeout: Option<Duration>,
}

impl SessionOptions {
    #[must_use]
    pub fn new(database_type: DatabaseType, connection_string: impl Into<String>) -> Self {
        Self {
            database_type,
            connection_string: connection_string.into(),
            command_timeout: None,
        }
    }
}

/// Fluent builder for [`SessionOptions`].
#[derive(Debug, Clone)]
pub struct SessionOptionsBuilder {
    opts: SessionOptions,
}

impl SessionOptionsBuilder {
    #[must_use]
    pub fn new(database_type: DatabaseType, connection_string: impl Into<String>) -> Self {
        Self {
            opts: SessionOptions::new(database_type, connection_string),
        }
    }

    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.opts.command_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn finish(self) -> SessionOptions {
        self.opts
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the connection string is unusable.
    pub fn build(self) -> Result<Session, SqlSessionError> {
        Session::from_options(self.finish())
    }
}

impl Session {
    /// Start building a session for a bundled backend.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use sql_session::prelude::*;
    ///
    /// let session = Session::builder(DatabaseType::Sqlite, ":memory:")
    ///     .command_timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(session.command_timeout(), Some(Duration::from_secs(30)));
    /// ```
    #[must_use]
    pub fn builder(
        database_type: DatabaseType,
        connection_string: impl Into<String>,
    ) -> SessionOptionsBuilder {
        SessionOptionsBuilder::new(database_type, connection_string)
    }

    /// Build a session from options.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the connection string is unusable.
    pub fn from_options(options: SessionOptions) -> Result<Self, SqlSessionError> {
        let SessionOptions {
            database_type,
            connection_string,
            command_timeout,
        } = options;
        let mut session = match database_type {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Session::sqlite(connection_string)?,
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Session::postgres(connection_string)?,
            #[allow(unreachable_patterns)]
            other => {
                return Err(SqlSessionError::ConfigError(format!(
                    "{other:?} support is not compiled in"
                )));
            }
        };
        session.set_command_timeout(command_timeout);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_type_parses_case_insensitively() {
        assert_eq!("SQLite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert_eq!("postgres".parse::<DatabaseType>().unwrap(), DatabaseType::Postgres);
        assert!(matches!(
            "oracle".parse::<DatabaseType>(),
            Err(SqlSessionError::ConfigError(_))
        ));
    }

    #[cfg(not(feature = "postgres"))]
    #[test]
    fn backend_not_compiled_in_is_a_config_error() {
        assert!(matches!(
            Session::builder(DatabaseType::Postgres, "host=localhost dbname=app").build(),
            Err(SqlSessionError::ConfigError(_))
        ));
    }
}
