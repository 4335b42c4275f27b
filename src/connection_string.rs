//! ADO-style connection strings (`Data Source=host;Initial Catalog=db;...`).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlSessionError;

static PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s*([^=;]+?)\s*=\s*("(?:[^"]|"")*"|'(?:[^']|'')*'|[^;]*?)\s*(?:;|$)"#)
        .unwrap_or_else(|e| panic!("connection string pattern is invalid: {e}"))
});

const DATABASE_KEYS: &[&str] = &["initial catalog", "database", "dbname"];
const SERVER_KEYS: &[&str] = &["data source", "server", "address", "addr", "host"];

/// Split a connection string into lower-cased keys and unquoted values.
///
/// Values may be wrapped in single or double quotes (a doubled quote escapes itself), which
/// lets them contain `;`. Later duplicates of a key override earlier ones.
#[must_use]
pub fn parse_pairs(connection_string: &str) -> HashMap<String, String> {
    PAIR.captures_iter(connection_string)
        .map(|caps| {
            let key = caps[1].trim().to_ascii_lowercase();
            (key, unquote(&caps[2]))
        })
        .collect()
}

fn unquote(raw: &str) -> String {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            let inner = &raw[1..raw.len() - 1];
            let doubled = format!("{quote}{quote}");
            return inner.replace(&doubled, &quote.to_string());
        }
    }
    raw.to_string()
}

/// Whether `connection_string` looks like `key=value` pairs rather than a bare path or URL.
#[must_use]
pub fn is_key_value(connection_string: &str) -> bool {
    connection_string
        .split(';')
        .next()
        .and_then(|first| first.split_once('='))
        .is_some_and(|(key, _)| {
            let key = key.trim();
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '_')
        })
}

/// The database and server a session points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    pub database: String,
    pub server: String,
}

impl ConnectionIdentity {
    /// Read the catalog and data source from an ADO-style connection string.
    ///
    /// ```rust
    /// use sql_session::connection_string::ConnectionIdentity;
    ///
    /// let id = ConnectionIdentity::parse(
    ///     "Data Source=myHost;Initial Catalog=myBase;Integrated Security=True",
    /// ).unwrap();
    /// assert_eq!(id.database, "myBase");
    /// assert_eq!(id.server, "myHost");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if either component is missing.
    pub fn parse(connection_string: &str) -> Result<Self, SqlSessionError> {
        let pairs = parse_pairs(connection_string);
        Ok(Self {
            database: lookup(&pairs, DATABASE_KEYS, "Initial Catalog")?,
            server: lookup(&pairs, SERVER_KEYS, "Data Source")?,
        })
    }
}

fn lookup(
    pairs: &HashMap<String, String>,
    keys: &[&str],
    label: &str,
) -> Result<String, SqlSessionError> {
    keys.iter()
        .find_map(|key| pairs.get(*key))
        .cloned()
        .ok_or_else(|| {
            SqlSessionError::NotFound(format!("Connection string doesn't contain '{label}'."))
        })
}
