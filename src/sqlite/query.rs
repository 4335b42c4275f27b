use std::sync::Arc;

use rusqlite::types::Value as SqliteValue;
use rusqlite::{Row, Statement};

use crate::error::SqlSessionError;
use crate::results::{ValueSet, index_columns};
use crate::types::Value;

/// Extract a [`Value`] from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlSessionError::SqliteError` if the column cannot be read.
pub fn sqlite_extract_value(row: &Row<'_>, idx: usize) -> Result<Value, SqlSessionError> {
    let value: SqliteValue = row.get(idx)?;
    Ok(match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(i) => Value::Int(i),
        SqliteValue::Real(f) => Value::Float(f),
        SqliteValue::Text(s) => Value::Text(s),
        SqliteValue::Blob(b) => Value::Blob(b),
    })
}

/// Run an already bound statement and read every row.
///
/// All rows share one column-name list and one name index.
///
/// # Errors
///
/// Returns `SqlSessionError::SqliteError` if stepping the statement or reading a value fails.
pub fn read_rows(stmt: &mut Statement<'_>) -> Result<Vec<ValueSet>, SqlSessionError> {
    let column_names: Arc<Vec<String>> = Arc::new(
        stmt.column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
    );
    let column_index = Arc::new(index_columns(&column_names));
    let column_count = column_names.len();

    let mut rows = stmt.raw_query();
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..column_count)
            .map(|i| sqlite_extract_value(row, i))
            .collect::<Result<Vec<_>, _>>()?;
        result.push(ValueSet::with_index(
            Arc::clone(&column_names),
            Arc::clone(&column_index),
            values,
        ));
    }
    Ok(result)
}

/// First column of the first row of an already bound statement.
///
/// # Errors
///
/// Returns `SqlSessionError::SqliteError` if stepping the statement or reading the value fails.
pub fn read_scalar(stmt: &mut Statement<'_>) -> Result<Option<Value>, SqlSessionError> {
    if stmt.column_count() == 0 {
        stmt.raw_execute()?;
        return Ok(None);
    }
    let mut rows = stmt.raw_query();
    match rows.next()? {
        Some(row) => Ok(Some(sqlite_extract_value(row, 0)?)),
        None => Ok(None),
    }
}
