use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::conversion::FromValue;
use crate::error::SqlSessionError;
use crate::types::Value;

/// An immutable snapshot of one result row.
///
/// Column names are shared by every row read from the same statement; values are stored in
/// the order the columns were read.
#[derive(Debug, Clone)]
pub struct ValueSet {
    column_names: Arc<Vec<String>>,
    values: Vec<Value>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    column_index: Arc<HashMap<String, usize>>,
}

impl ValueSet {
    /// Build a row from column names and the values read for them.
    ///
    /// If a name appears twice (`SELECT a, a`), lookups by name return the first column.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self::with_index(column_names, column_index, values)
    }

    /// Build a row reusing an index built once for the whole result.
    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<Value>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Build a synthetic row from name/value pairs, bypassing the driver.
    ///
    /// ```rust
    /// use sql_session::prelude::*;
    ///
    /// let row = ValueSet::from_pairs([("Id", Value::Int(1)), ("TestValue", Value::Int(5))]);
    /// assert_eq!(row.get::<i32>("Id").unwrap(), 1);
    /// assert_eq!(row.value("TestValue").unwrap(), &Value::Int(5));
    /// ```
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let (names, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self::new(Arc::new(names), values)
    }

    /// Convert the value of column `name` to `T`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if the column is absent and
    /// `SqlSessionError::ConversionError` if the value cannot be coerced to `T`.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, SqlSessionError> {
        T::from_value(self.value(name)?)
    }

    /// The raw value of column `name`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::NotFound` if the column is absent.
    pub fn value(&self, name: &str) -> Result<&Value, SqlSessionError> {
        self.column_index
            .get(name)
            .and_then(|&idx| self.values.get(idx))
            .ok_or_else(|| SqlSessionError::NotFound(format!("Column '{name}' couldn't be found.")))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Read-only view of the whole name to value mapping, in column order.
    #[must_use]
    pub fn values(&self) -> ValuesView<'_> {
        ValuesView { row: self }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Borrowed name to value mapping of a [`ValueSet`].
///
/// Lookups follow the row's rules (first duplicate wins); iteration yields every column,
/// duplicates included, in the order they were read.
#[derive(Debug, Clone, Copy)]
pub struct ValuesView<'a> {
    row: &'a ValueSet,
}

impl<'a> ValuesView<'a> {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.row.value(name).ok()
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.row.contains(name)
    }

    pub fn keys(self) -> impl Iterator<Item = &'a str> + 'a {
        self.row.column_names.iter().map(String::as_str)
    }

    pub fn iter(self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.keys().zip(self.row.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.row.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }
    index
}

impl Serialize for ValueSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.values().iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
