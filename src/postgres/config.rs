use std::str::FromStr;
use std::time::Duration;

use tokio_postgres::config::Host;

use crate::connection_string::{ConnectionIdentity, parse_pairs};
use crate::error::SqlSessionError;

/// Options for connecting to `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub config: tokio_postgres::Config,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    /// Parse a connection string.
    ///
    /// Strings containing `;` are read as ADO-style pairs
    /// (`Host=db;Port=5432;Database=app;Username=u;Password=p`); anything else goes to
    /// `tokio_postgres::Config` as a URL or libpq `key=value` string.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the string cannot be parsed, or if the host or
    /// database name is missing.
    pub fn parse(connection_string: &str) -> Result<Self, SqlSessionError> {
        let config = if connection_string.contains(';') {
            from_pairs(connection_string)?
        } else {
            tokio_postgres::Config::from_str(connection_string).map_err(|e| {
                SqlSessionError::ConfigError(format!("invalid Postgres connection string: {e}"))
            })?
        };

        if config.get_dbname().is_none() {
            return Err(SqlSessionError::ConfigError("dbname is required".to_string()));
        }
        if config.get_hosts().is_empty() {
            return Err(SqlSessionError::ConfigError("host is required".to_string()));
        }
        Ok(Self { config })
    }

    /// Database name and first host.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if either is missing.
    pub fn identity(&self) -> Result<ConnectionIdentity, SqlSessionError> {
        let database = self.config.get_dbname().ok_or_else(|| {
            SqlSessionError::NotFound("Connection string doesn't contain 'Database'.".into())
        })?;
        let server = self
            .config
            .get_hosts()
            .first()
            .map(host_name)
            .ok_or_else(|| {
                SqlSessionError::NotFound("Connection string doesn't contain 'Host'.".into())
            })?;
        Ok(ConnectionIdentity {
            database: database.to_string(),
            server,
        })
    }
}

fn host_name(host: &Host) -> String {
    match host {
        Host::Tcp(name) => name.clone(),
        #[cfg(unix)]
        Host::Unix(path) => path.display().to_string(),
    }
}

fn from_pairs(connection_string: &str) -> Result<tokio_postgres::Config, SqlSessionError> {
    let mut config = tokio_postgres::Config::new();
    for (key, value) in parse_pairs(connection_string) {
        match key.as_str() {
            "host" | "server" | "data source" => {
                config.host(&value);
            }
            "port" => {
                config.port(parse_number(&key, &value)?);
            }
            "database" | "initial catalog" | "dbname" => {
                config.dbname(&value);
            }
            "username" | "user id" | "user" | "uid" => {
                config.user(&value);
            }
            "password" | "pwd" => {
                config.password(value.as_bytes());
            }
            "application name" => {
                config.application_name(&value);
            }
            "timeout" | "connect timeout" => {
                config.connect_timeout(Duration::from_secs(parse_number(&key, &value)?));
            }
            _ => tracing::debug!(key = %key, "ignoring unsupported Postgres connection option"),
        }
    }
    Ok(config)
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, SqlSessionError> {
    value.trim().parse().map_err(|_| {
        SqlSessionError::ConfigError(format!("invalid value '{value}' for option '{key}'"))
    })
}
