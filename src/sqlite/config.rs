use std::time::Duration;

use crate::connection_string::{is_key_value, parse_pairs};
use crate::error::SqlSessionError;

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    pub db_path: String,
    /// How long to wait on a locked database; `None` keeps rusqlite's default of five seconds.
    pub busy_timeout: Option<Duration>,
    pub foreign_keys: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: None,
            foreign_keys: false,
        }
    }

    /// Parse a bare path (`app.db`, `:memory:`) or an ADO-style string
    /// (`Data Source=app.db;Busy Timeout=500;Foreign Keys=True`).
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the data source is missing or an option value
    /// cannot be parsed.
    pub fn parse(connection_string: &str) -> Result<Self, SqlSessionError> {
        let connection_string = connection_string.trim();
        if !is_key_value(connection_string) {
            if connection_string.is_empty() {
                return Err(SqlSessionError::ConfigError(
                    "SQLite connection string is empty".into(),
                ));
            }
            return Ok(Self::new(connection_string));
        }

        let pairs = parse_pairs(connection_string);
        let db_path = pairs
            .get("data source")
            .or_else(|| pairs.get("datasource"))
            .or_else(|| pairs.get("filename"))
            .ok_or_else(|| {
                SqlSessionError::ConfigError(
                    "SQLite connection string has no 'Data Source'".into(),
                )
            })?;

        let mut options = Self::new(db_path.clone());
        if let Some(ms) = pairs.get("busy timeout").or_else(|| pairs.get("default timeout")) {
            let ms: u64 = ms.parse().map_err(|_| {
                SqlSessionError::ConfigError(format!("invalid SQLite busy timeout '{ms}'"))
            })?;
            options.busy_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(flag) = pairs.get("foreign keys") {
            options.foreign_keys = parse_flag(flag)?;
        }
        Ok(options)
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.db_path == ":memory:" || self.db_path.starts_with("file::memory:")
    }
}

fn parse_flag(flag: &str) -> Result<bool, SqlSessionError> {
    match flag.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(SqlSessionError::ConfigError(format!(
            "invalid boolean option '{flag}'"
        ))),
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }
}
