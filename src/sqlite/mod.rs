//! `SQLite` backend on rusqlite.
//!
//! - config: connection string parsing and options
//! - params: declared type table and named parameter binding
//! - query: row extraction into [`ValueSet`](crate::results::ValueSet)s
//! - driver: the [`Driver`](crate::driver::Driver) implementation

pub mod config;
pub mod driver;
pub mod params;
pub mod query;

use std::path::Path;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use driver::{SqliteDriver, SqliteTransaction};

use crate::connection::{Connection, DbConnection};
use crate::connection_string::ConnectionIdentity;
use crate::error::SqlSessionError;
use crate::factory::ConnectionFactory;
use crate::messages::MessageSink;

/// Creates [`SqliteDriver`] connections.
///
/// `SQLite` reports no server messages, so the message sink is unused.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteFactory;

impl ConnectionFactory for SqliteFactory {
    fn create(
        &self,
        connection_string: &str,
        _messages: MessageSink,
    ) -> Result<Box<dyn Connection>, SqlSessionError> {
        let options = SqliteOptions::parse(connection_string)?;
        Ok(Box::new(DbConnection::new(SqliteDriver::new(options))))
    }

    /// The server is the database path; the database is the file name without extension.
    fn identity(&self, connection_string: &str) -> Result<ConnectionIdentity, SqlSessionError> {
        let options = SqliteOptions::parse(connection_string)?;
        let database = if options.is_in_memory() {
            options.db_path.clone()
        } else {
            Path::new(&options.db_path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    SqlSessionError::NotFound(format!(
                        "Connection string doesn't contain a database file: '{}'.",
                        options.db_path
                    ))
                })?
        };
        Ok(ConnectionIdentity {
            database,
            server: options.db_path,
        })
    }
}
