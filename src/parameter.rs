use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::types::{SqlType, Value};

static NEXT_PARAMETER_ID: AtomicU64 = AtomicU64::new(1);

/// Rust values that can be bound as a parameter, together with the type tag they declare.
///
/// `Option<T>` declares the same tag as `T` and binds `None` as NULL.
pub trait ParameterValue {
    fn sql_type() -> SqlType;
    fn into_value(self) -> Value;
}

macro_rules! parameter_value {
    ($ty:ty, $tag:expr, |$v:ident| $conv:expr) => {
        impl ParameterValue for $ty {
            fn sql_type() -> SqlType {
                $tag
            }
            fn into_value(self) -> Value {
                let $v = self;
                $conv
            }
        }
    };
}

parameter_value!(String, SqlType::String, |v| Value::Text(v));
parameter_value!(&str, SqlType::String, |v| Value::Text(v.to_owned()));
parameter_value!(i16, SqlType::Int, |v| Value::Int(i64::from(v)));
parameter_value!(i32, SqlType::Int, |v| Value::Int(i64::from(v)));
parameter_value!(i64, SqlType::Long, |v| Value::Int(v));
parameter_value!(bool, SqlType::Bool, |v| Value::Bool(v));
parameter_value!(char, SqlType::Char, |v| Value::Text(v.to_string()));
parameter_value!(f32, SqlType::Float, |v| Value::Float(f64::from(v)));
parameter_value!(f64, SqlType::Float, |v| Value::Float(v));
parameter_value!(NaiveDateTime, SqlType::DateTime, |v| Value::Timestamp(v));
parameter_value!(Decimal, SqlType::Decimal, |v| Value::Decimal(v));
parameter_value!(Uuid, SqlType::Guid, |v| Value::Guid(v));
parameter_value!(Vec<u8>, SqlType::Bytes, |v| Value::Blob(v));
parameter_value!(JsonValue, SqlType::Json, |v| Value::JSON(v));
parameter_value!(Value, SqlType::Object, |v| v);

impl<T: ParameterValue> ParameterValue for Option<T> {
    fn sql_type() -> SqlType {
        T::sql_type()
    }

    fn into_value(self) -> Value {
        self.map_or(Value::Null, ParameterValue::into_value)
    }
}

/// A named, typed value bound to a statement placeholder.
///
/// The name is the literal used in SQL, with or without its leading `@`
/// (`"Id"` and `"@Id"` both bind `@Id`). A parameter is immutable once built.
///
/// Every constructed parameter has its own identity; clones share it. A [`ParameterSet`]
/// deduplicates by identity, not by name.
#[derive(Debug, Clone)]
pub struct Parameter {
    id: u64,
    name: String,
    sql_type: SqlType,
    value: Value,
}

impl Parameter {
    /// Build a parameter whose declared type is inferred from the Rust type of `value`.
    ///
    /// ```rust
    /// use sql_session::prelude::*;
    ///
    /// let p = Parameter::new("A", 2);
    /// assert_eq!(p.name(), "A");
    /// assert_eq!(p.value(), &Value::Int(2));
    /// assert_eq!(p.sql_type(), &SqlType::Int);
    /// ```
    pub fn new<T: ParameterValue>(name: impl Into<String>, value: T) -> Self {
        Self::with_type(name, T::sql_type(), value)
    }

    /// Build a parameter with an explicitly declared type, e.g. a decimal carried as text.
    pub fn with_type<T: ParameterValue>(name: impl Into<String>, sql_type: SqlType, value: T) -> Self {
        Self {
            id: NEXT_PARAMETER_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            sql_type,
            value: value.into_value(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name without a leading `@`, `:` or `$`.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        strip_sigil(&self.name)
    }

    #[must_use]
    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether this parameter binds the placeholder `name` (sigil and ASCII case ignored).
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.bare_name().eq_ignore_ascii_case(strip_sigil(name))
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Parameter {}

impl Hash for Parameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

pub(crate) fn strip_sigil(name: &str) -> &str {
    name.strip_prefix(['@', ':', '$']).unwrap_or(name)
}

/// A set of parameters for one statement execution.
///
/// Parameters are kept in insertion order. Adding the same parameter (or a clone of it)
/// twice keeps one copy; two distinct parameters with the same name are both kept, and
/// which one the driver binds is not defined.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fluent form of [`ParameterSet::add`] for a freshly built parameter.
    ///
    /// ```rust
    /// use sql_session::prelude::*;
    ///
    /// let params = ParameterSet::new().with("Id", 79).with("Value", 79);
    /// assert_eq!(params.len(), 2);
    /// ```
    #[must_use]
    pub fn with<T: ParameterValue>(mut self, name: impl Into<String>, value: T) -> Self {
        self.add(Parameter::new(name, value));
        self
    }

    /// Add a parameter; returns `false` when this exact parameter is already present.
    pub fn add(&mut self, parameter: Parameter) -> bool {
        if self.parameters.contains(&parameter) {
            return false;
        }
        self.parameters.push(parameter);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.parameters.iter()
    }

    /// First parameter binding the placeholder `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.matches(name))
    }
}

impl FromIterator<Parameter> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<Parameter> for ParameterSet {
    fn extend<I: IntoIterator<Item = Parameter>>(&mut self, iter: I) {
        for parameter in iter {
            self.add(parameter);
        }
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

impl IntoIterator for ParameterSet {
    type Item = Parameter;
    type IntoIter = std::vec::IntoIter<Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.into_iter()
    }
}
