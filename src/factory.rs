use crate::connection::Connection;
use crate::connection_string::ConnectionIdentity;
use crate::error::SqlSessionError;
use crate::messages::MessageSink;

/// Builds the [`Connection`] a session runs its statements on.
///
/// This is the one place a backend, or a test double, is plugged into a session.
pub trait ConnectionFactory: Send + Sync {
    /// Create a connection for `connection_string`. Implementations should not connect yet;
    /// the physical connection is opened on first use.
    ///
    /// `messages` receives server notifications for the lifetime of the connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the connection string is unusable.
    fn create(
        &self,
        connection_string: &str,
        messages: MessageSink,
    ) -> Result<Box<dyn Connection>, SqlSessionError>;

    /// Database and server named by `connection_string`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if a component is missing.
    fn identity(&self, connection_string: &str) -> Result<ConnectionIdentity, SqlSessionError> {
        ConnectionIdentity::parse(connection_string)
    }
}
