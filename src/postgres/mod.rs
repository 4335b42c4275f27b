//! `PostgreSQL` backend on tokio-postgres.
//!
//! - config: connection string parsing
//! - params: declared type table, placeholder rewriting and the `ToSql` impl for [`Value`](crate::types::Value)
//! - query: row extraction and the streaming row reader
//! - driver: the [`Driver`](crate::driver::Driver) implementation

pub mod config;
pub mod driver;
pub mod params;
pub mod query;

pub use config::PostgresOptions;
pub use driver::{PostgresDriver, PostgresTransaction};

use crate::connection::{Connection, DbConnection};
use crate::connection_string::ConnectionIdentity;
use crate::error::SqlSessionError;
use crate::factory::ConnectionFactory;
use crate::messages::MessageSink;

/// Creates [`PostgresDriver`] connections that report notices to the session's sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresFactory;

impl ConnectionFactory for PostgresFactory {
    fn create(
        &self,
        connection_string: &str,
        messages: MessageSink,
    ) -> Result<Box<dyn Connection>, SqlSessionError> {
        let options = PostgresOptions::parse(connection_string)?;
        Ok(Box::new(DbConnection::new(PostgresDriver::new(
            options, messages,
        ))))
    }

    fn identity(&self, connection_string: &str) -> Result<ConnectionIdentity, SqlSessionError> {
        PostgresOptions::parse(connection_string)?.identity()
    }
}
