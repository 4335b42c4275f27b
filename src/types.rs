use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::SqlSessionError;

/// Values that can be bound as parameters or read back from a row.
///
/// The same enum is used by every backend so callers never branch on driver types:
/// ```rust
/// use sql_session::prelude::*;
///
/// let values = vec![Value::Int(1), Value::Text("alice".into()), Value::Bool(true)];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
    /// Exact decimal; serialized as its text so no digits are lost
    Decimal(Decimal),
    /// UUID / uniqueidentifier
    Guid(Uuid),
}

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let Value::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let Value::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let Value::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let Value::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        if let Value::Decimal(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_guid(&self) -> Option<Uuid> {
        if let Value::Guid(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Short name of the variant, used in conversion error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bool(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::Null => "NULL",
            Value::JSON(_) => "json",
            Value::Blob(_) => "blob",
            Value::Decimal(_) => "decimal",
            Value::Guid(_) => "guid",
        }
    }
}

/// Declared type of a parameter.
///
/// Providers translate the tag into their own SQL type through a fixed lookup table;
/// nullable Rust values (`Option<T>`) carry the same tag as `T`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    String,
    Int,
    Long,
    Bool,
    DateTime,
    Char,
    Decimal,
    Guid,
    Float,
    Bytes,
    Json,
    /// Untyped fallback; the provider decides how to bind it.
    Object,
    /// A type tag no provider knows about. Binding it is a configuration error.
    Other(String),
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::String => f.write_str("string"),
            SqlType::Int => f.write_str("int"),
            SqlType::Long => f.write_str("long"),
            SqlType::Bool => f.write_str("bool"),
            SqlType::DateTime => f.write_str("datetime"),
            SqlType::Char => f.write_str("char"),
            SqlType::Decimal => f.write_str("decimal"),
            SqlType::Guid => f.write_str("guid"),
            SqlType::Float => f.write_str("float"),
            SqlType::Bytes => f.write_str("bytes"),
            SqlType::Json => f.write_str("json"),
            SqlType::Object => f.write_str("object"),
            SqlType::Other(name) => f.write_str(name),
        }
    }
}

/// Whether a statement is plain SQL text or the name of a stored procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    #[default]
    Text,
    StoredProcedure,
}

/// The database backends a session can be opened against.
///
/// Every variant exists regardless of features; building a session for a backend that was
/// not compiled in is a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatabaseType {
    /// `SQLite` database
    Sqlite,
    /// `PostgreSQL` database
    Postgres,
}

impl FromStr for DatabaseType {
    type Err = SqlSessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <DatabaseType as ValueEnum>::from_str(s, true)
            .map_err(|_| SqlSessionError::ConfigError(format!("unknown database type '{s}'")))
    }
}
