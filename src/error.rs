use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlSessionError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// A requested resource, file, row column or connection-string component is absent.
    /// The payload is the complete, caller-facing sentence.
    #[error("{0}")]
    NotFound(String),

    #[error("Conversion error: {0}")]
    ConversionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection has already been disposed")]
    Disposed,

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}
