use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::StreamExt;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tokio::runtime::Runtime;
use tokio_postgres::types::Type;
use tokio_postgres::{Column, RowStream};
use uuid::Uuid;

use crate::error::SqlSessionError;
use crate::results::{RowReader, ValueSet, index_columns};
use crate::types::Value;

/// Extracts a [`Value`] from a `tokio_postgres` row at the given index.
///
/// # Errors
/// Returns `SqlSessionError::PostgresError` if the column cannot be decoded.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<Value, SqlSessionError> {
    let type_info = row.columns()[idx].type_();

    let value = match *type_info {
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(|v| Value::Int(i64::from(v))),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(|v| Value::Int(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Int),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(|v| Value::Int(i64::from(v))),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| Value::Float(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::Float),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(Value::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| Value::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| Value::Timestamp(v.and_time(NaiveTime::MIN))),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<JsonValue>>(idx)?.map(Value::JSON),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Blob),
        Type::NUMERIC => row.try_get::<_, Option<Decimal>>(idx)?.map(Value::Decimal),
        Type::UUID => row.try_get::<_, Option<Uuid>>(idx)?.map(Value::Guid),
        // For other types, attempt to get as string
        _ => row.try_get::<_, Option<String>>(idx)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Column names and their index, shared by every row of one statement.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    names: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

impl ColumnLayout {
    #[must_use]
    pub fn new(columns: &[Column]) -> Self {
        let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
        let index = Arc::new(index_columns(&names));
        Self {
            names: Arc::new(names),
            index,
        }
    }

    /// # Errors
    /// Returns `SqlSessionError::PostgresError` if a column cannot be decoded.
    pub fn read(&self, row: &tokio_postgres::Row) -> Result<ValueSet, SqlSessionError> {
        let values = (0..self.names.len())
            .map(|idx| postgres_extract_value(row, idx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ValueSet::with_index(
            Arc::clone(&self.names),
            Arc::clone(&self.index),
            values,
        ))
    }
}

/// Rows streamed from the server one at a time, blocking on the driver's runtime.
pub struct PgRowReader {
    runtime: Arc<Runtime>,
    stream: Pin<Box<RowStream>>,
    layout: ColumnLayout,
}

impl PgRowReader {
    pub(super) fn new(runtime: Arc<Runtime>, stream: RowStream, layout: ColumnLayout) -> Self {
        Self {
            runtime,
            stream: Box::pin(stream),
            layout,
        }
    }
}

impl RowReader for PgRowReader {
    fn next_row(&mut self) -> Result<Option<ValueSet>, SqlSessionError> {
        match self.runtime.block_on(self.stream.next()) {
            Some(row) => Ok(Some(self.layout.read(&row?)?)),
            None => Ok(None),
        }
    }
}
