//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{SessionOptions, SessionOptionsBuilder};
pub use crate::connection::{Connection, DbConnection};
pub use crate::conversion::FromValue;
pub use crate::error::SqlSessionError;
pub use crate::factory::ConnectionFactory;
pub use crate::messages::{MessageSink, ServerMessage, Severity};
pub use crate::parameter::{Parameter, ParameterSet, ParameterValue};
pub use crate::resources::{ScriptStore, read_file};
pub use crate::results::{Rows, ValueSet};
pub use crate::session::{ProcedureSession, Session};
pub use crate::types::{CommandKind, DatabaseType, SqlType, Value};

pub use rust_decimal::Decimal;
pub use uuid::Uuid;

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresFactory, PostgresOptions};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteFactory, SqliteOptions, SqliteOptionsBuilder};
