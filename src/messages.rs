//! Informational and error messages sent by the database server outside of a result.
//!
//! A session owns one [`MessageDispatcher`]; every connection it creates gets a handle to it.
//! Drivers classify each notification by severity and hand it to the dispatcher, which calls
//! the registered handlers synchronously, in arrival order, on the thread that was driving the
//! connection.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a server notification, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Log,
    Info,
    Notice,
    Warning,
    Error,
    Fatal,
    Panic,
}

impl Severity {
    /// Notifications at or above this severity go to the error stream.
    pub const ERROR_THRESHOLD: Severity = Severity::Error;

    /// Parse a Postgres-style severity word (`NOTICE`, `WARNING`, `ERROR`, ...).
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_uppercase().as_str() {
            "DEBUG" | "DEBUG1" | "DEBUG2" | "DEBUG3" | "DEBUG4" | "DEBUG5" => Severity::Debug,
            "LOG" => Severity::Log,
            "INFO" => Severity::Info,
            "WARNING" => Severity::Warning,
            "ERROR" => Severity::Error,
            "FATAL" => Severity::Fatal,
            "PANIC" => Severity::Panic,
            _ => Severity::Notice,
        }
    }

    /// Map a SQL Server style error class (0-25); classes above 10 are errors.
    #[must_use]
    pub fn from_class(class: u8) -> Self {
        match class {
            0..=10 => Severity::Info,
            11..=19 => Severity::Error,
            _ => Severity::Fatal,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self >= Self::ERROR_THRESHOLD
    }
}

/// One notification from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    pub severity: Severity,
    /// Driver-specific code (SQLSTATE for Postgres), empty when the driver has none.
    pub code: String,
    pub text: String,
}

impl ServerMessage {
    pub fn new(severity: Severity, code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            text: text.into(),
        }
    }
}

type Handler = Arc<dyn Fn(&ServerMessage) + Send + Sync>;

/// Fan-out point between drivers and the handlers registered on a session.
#[derive(Default)]
pub struct MessageDispatcher {
    info: Mutex<Vec<Handler>>,
    errors: Mutex<Vec<Handler>>,
}

/// Shared handle to a session's dispatcher, passed to connection factories.
pub type MessageSink = Arc<MessageDispatcher>;

impl MessageDispatcher {
    #[must_use]
    pub fn new() -> MessageSink {
        Arc::new(Self::default())
    }

    /// Register a handler for informational messages.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Register a handler for error messages.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Route one notification to the error or informational handlers.
    ///
    /// Handlers run on a snapshot taken before the first call, so a handler may register
    /// more handlers; those see the next notification.
    pub fn deliver(&self, message: &ServerMessage) {
        tracing::debug!(severity = ?message.severity, code = %message.code, "server message: {}", message.text);
        let handlers = if message.severity.is_error() {
            &self.errors
        } else {
            &self.info
        };
        let snapshot: Vec<Handler> = handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in &snapshot {
            handler(message);
        }
    }
}

impl fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |m: &Mutex<Vec<Handler>>| m.lock().map_or(0, |v| v.len());
        f.debug_struct("MessageDispatcher")
            .field("info_handlers", &count(&self.info))
            .field("error_handlers", &count(&self.errors))
            .finish()
    }
}
