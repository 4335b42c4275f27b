use std::sync::LazyLock;

use rusqlite::Statement;
use rusqlite::types::Value as SqliteValue;

use crate::error::SqlSessionError;
use crate::parameter::{Parameter, ParameterSet};
use crate::type_map::TypeMap;
use crate::types::{SqlType, Value};

/// Storage classes a declared parameter type is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteType {
    Text,
    Integer,
    Real,
    /// Text that is stored as a number when it parses as one.
    Numeric,
    Blob,
    /// Bound as whatever the value already is.
    Any,
}

pub static SQLITE_TYPES: LazyLock<TypeMap<SqliteType>> = LazyLock::new(|| {
    TypeMap::new(
        "SQLite",
        [
            (SqlType::String, SqliteType::Text),
            (SqlType::Char, SqliteType::Text),
            (SqlType::Guid, SqliteType::Text),
            (SqlType::DateTime, SqliteType::Text),
            (SqlType::Json, SqliteType::Text),
            (SqlType::Int, SqliteType::Integer),
            (SqlType::Long, SqliteType::Integer),
            (SqlType::Bool, SqliteType::Integer),
            (SqlType::Float, SqliteType::Real),
            (SqlType::Decimal, SqliteType::Numeric),
            (SqlType::Bytes, SqliteType::Blob),
            (SqlType::Object, SqliteType::Any),
        ],
    )
});

/// Convert a single [`Value`] to a rusqlite value.
#[must_use]
pub fn value_to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Timestamp(dt) => SqliteValue::Text(dt.format("%F %T%.f").to_string()),
        Value::Null => SqliteValue::Null,
        Value::JSON(jval) => SqliteValue::Text(jval.to_string()),
        Value::Blob(bytes) => SqliteValue::Blob(bytes.clone()),
        Value::Decimal(d) => numeric_text(d.to_string()),
        Value::Guid(u) => SqliteValue::Text(u.hyphenated().to_string()),
    }
}

/// Convert a parameter according to its declared type.
///
/// # Errors
///
/// Returns `SqlSessionError::ConfigError` for a declared type with no `SQLite` mapping.
#[allow(clippy::cast_possible_truncation)]
pub fn parameter_to_sqlite(parameter: &Parameter) -> Result<SqliteValue, SqlSessionError> {
    let storage = SQLITE_TYPES.resolve(parameter.sql_type())?;
    let value = value_to_sqlite(parameter.value());
    Ok(match (storage, value) {
        (SqliteType::Numeric, SqliteValue::Text(text)) => numeric_text(text),
        (SqliteType::Integer, SqliteValue::Real(f)) if f.fract() == 0.0 => {
            SqliteValue::Integer(f as i64)
        }
        (_, value) => value,
    })
}

fn numeric_text(text: String) -> SqliteValue {
    if let Ok(i) = text.trim().parse::<i64>() {
        SqliteValue::Integer(i)
    } else if let Ok(f) = text.trim().parse::<f64>() {
        SqliteValue::Real(f)
    } else {
        SqliteValue::Text(text)
    }
}

/// Bind every placeholder of `stmt` by name from `parameters`.
///
/// Placeholders may be written `@Name`, `:Name` or `$Name`; a parameter named `Name` or
/// `@Name` binds all three. Supplied parameters the statement does not use are ignored.
///
/// # Errors
///
/// Returns `SqlSessionError::ParameterError` if a placeholder is positional or has no
/// supplied value, or the conversion error of a parameter.
pub fn bind_named(
    stmt: &mut Statement<'_>,
    parameters: Option<&ParameterSet>,
) -> Result<(), SqlSessionError> {
    let count = stmt.parameter_count();
    let mut bound = 0;
    for index in 1..=count {
        let placeholder = stmt.parameter_name(index).map(str::to_owned).ok_or_else(|| {
            SqlSessionError::ParameterError(format!(
                "placeholder {index} is positional; use a named placeholder such as @Name"
            ))
        })?;
        let parameter = parameters
            .and_then(|set| set.get(&placeholder))
            .ok_or_else(|| {
                SqlSessionError::ParameterError(format!(
                    "no value supplied for placeholder '{placeholder}'"
                ))
            })?;
        stmt.raw_bind_parameter(index, parameter_to_sqlite(parameter)?)?;
        bound += 1;
    }

    let supplied = parameters.map_or(0, ParameterSet::len);
    if supplied > bound {
        tracing::debug!(supplied, bound, "ignoring parameters the statement does not use");
    }
    Ok(())
}
