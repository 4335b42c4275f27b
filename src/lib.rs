//! Lazy-connection database sessions with scoped transactions.
//!
//! A [`Session`](session::Session) holds no connection until the first statement runs. It
//! creates one through a [`ConnectionFactory`](factory::ConnectionFactory), keeps an explicit
//! transaction open across `execute_on_transaction` calls until `commit` or `rollback`, wraps
//! each batch in a transaction of its own, and rolls back whatever is left open when the
//! connection is closed.
//!
//! Backends are feature-gated: `sqlite` (default, rusqlite) and `postgres` (tokio-postgres on a
//! private runtime). SQL text uses `@Name` placeholders on both.
//!
//! ```rust
//! use sql_session::prelude::*;
//!
//! # fn main() -> Result<(), SqlSessionError> {
//! let mut session = Session::sqlite(":memory:")?;
//! session.execute("create table t (Id int, Value int)", None)?;
//! session.execute_batch(
//!     "insert into t values(@Id, @Value)",
//!     &[
//!         ParameterSet::new().with("Id", 79).with("Value", 79),
//!         ParameterSet::new().with("Id", 80).with("Value", 80),
//!     ],
//! )?;
//! let rows = session.select("select Id, Value from t order by Id", None)?;
//! assert_eq!(rows[1].get::<i32>("Value")?, 80);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod connection_string;
pub mod conversion;
pub mod driver;
pub mod error;
pub mod factory;
pub mod messages;
pub mod parameter;
pub mod prelude;
pub mod resources;
pub mod results;
pub mod session;
pub mod translation;
pub mod type_map;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::SqlSessionError;
pub use session::{ProcedureSession, Session};
