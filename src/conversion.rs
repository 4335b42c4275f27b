//! Typed retrieval of stored values.
//!
//! Row values and scalars come back from the driver untyped. `FromValue` coerces them into
//! the type a caller asks for, accepting the numeric/string-compatible conversions a loosely
//! typed database produces (an integer column read as `f64`, a numeric string read as `i32`,
//! a `0`/`1` column read as `bool`).

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::SqlSessionError;
use crate::types::Value;

/// Conversion from a stored [`Value`] into a Rust type.
pub trait FromValue: Sized {
    /// Convert a borrowed value.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConversionError` if the value cannot be coerced.
    fn from_value(value: &Value) -> Result<Self, SqlSessionError>;
}

fn incompatible(value: &Value, target: &str) -> SqlSessionError {
    SqlSessionError::ConversionError(format!(
        "cannot convert {} value {value:?} to {target}",
        value.kind()
    ))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Float(f) if f.is_finite() => {
                // Midpoints go to the even neighbour: 2.5 -> 2, 3.5 -> 4.
                let rounded = f.round_ties_even();
                if rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64 {
                    Ok(rounded as i64)
                } else {
                    Err(incompatible(value, "i64"))
                }
            }
            Value::Decimal(d) => d
                .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
                .to_i64()
                .ok_or_else(|| incompatible(value, "i64")),
            Value::Text(s) => s.trim().parse().map_err(|_| incompatible(value, "i64")),
            _ => Err(incompatible(value, "i64")),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
                let wide = i64::from_value(value)
                    .map_err(|_| incompatible(value, stringify!($ty)))?;
                <$ty>::try_from(wide).map_err(|_| incompatible(value, stringify!($ty)))
            }
        }
    )*};
}

narrow_int!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Decimal(d) => d.to_f64().ok_or_else(|| incompatible(value, "f64")),
            Value::Text(s) => s.trim().parse().map_err(|_| incompatible(value, "f64")),
            _ => Err(incompatible(value, "f64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(incompatible(value, "bool")),
            },
            _ => Err(incompatible(value, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Timestamp(dt) => Ok(dt.format("%F %T%.f").to_string()),
            Value::JSON(json) => Ok(json.to_string()),
            Value::Blob(bytes) => {
                String::from_utf8(bytes.clone()).map_err(|_| incompatible(value, "String"))
            }
            Value::Decimal(d) => Ok(d.to_string()),
            Value::Guid(u) => Ok(u.hyphenated().to_string()),
            Value::Null => Err(incompatible(value, "String")),
        }
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(incompatible(value, "char")),
                }
            }
            Value::Int(i) => u32::try_from(*i)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| incompatible(value, "char")),
            _ => Err(incompatible(value, "char")),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        value
            .as_timestamp()
            .ok_or_else(|| incompatible(value, "NaiveDateTime"))
    }
}

impl FromValue for JsonValue {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::JSON(json) => Ok(json.clone()),
            Value::Text(s) => serde_json::from_str(s).map_err(|_| incompatible(value, "JSON")),
            Value::Null => Ok(JsonValue::Null),
            Value::Int(i) => Ok(JsonValue::from(*i)),
            Value::Float(f) => Ok(JsonValue::from(*f)),
            Value::Bool(b) => Ok(JsonValue::from(*b)),
            Value::Decimal(d) => Ok(JsonValue::String(d.to_string())),
            Value::Guid(u) => Ok(JsonValue::String(u.to_string())),
            _ => Err(incompatible(value, "JSON")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::Blob(bytes) => Ok(bytes.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(incompatible(value, "Vec<u8>")),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(i) => Ok(Decimal::from(*i)),
            Value::Float(f) => Decimal::try_from(*f).map_err(|_| incompatible(value, "Decimal")),
            Value::Text(s) => s.trim().parse().map_err(|_| incompatible(value, "Decimal")),
            _ => Err(incompatible(value, "Decimal")),
        }
    }
}

/// Guids come back from `SQLite` as text, or as 16 raw bytes when stored as a blob.
impl FromValue for Uuid {
    fn from_value(value: &Value) -> Result<Self, SqlSessionError> {
        match value {
            Value::Guid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s.trim()).map_err(|_| incompatible(value, "Uuid")),
            Value::Blob(bytes) => Uuid::from_slice(bytes).map_err(|_| incompatible(value, "Uuid")),
            _ => Err(incompatible(value, "Uuid")),
        }
    }
}

/// Convert a value into `T`, treating an absent scalar as NULL.
///
/// # Errors
///
/// Returns `SqlSessionError::ConversionError` if the value cannot be coerced.
pub fn convert_scalar<T: FromValue>(value: Option<Value>) -> Result<T, SqlSessionError> {
    T::from_value(&value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_converts_to_int() {
        assert_eq!(i32::from_value(&Value::Text(" 42 ".into())).unwrap(), 42);
    }

    #[test]
    fn non_numeric_text_is_a_conversion_error() {
        let err = i32::from_value(&Value::Text("abc".into())).unwrap_err();
        assert!(matches!(err, SqlSessionError::ConversionError(_)));
    }

    #[test]
    fn int_out_of_range_for_narrow_type() {
        assert!(u8::from_value(&Value::Int(300)).is_err());
        assert_eq!(u8::from_value(&Value::Int(255)).unwrap(), 255);
    }

    #[test]
    fn null_only_converts_to_option() {
        assert!(i64::from_value(&Value::Null).is_err());
        assert_eq!(Option::<i64>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(&Value::Int(3)).unwrap(), Some(3));
    }

    #[test]
    fn floats_round_half_to_even() {
        assert_eq!(i64::from_value(&Value::Float(2.6)).unwrap(), 3);
        assert_eq!(i64::from_value(&Value::Float(2.5)).unwrap(), 2);
        assert_eq!(i64::from_value(&Value::Float(3.5)).unwrap(), 4);
        assert_eq!(i32::from_value(&Value::Float(-0.5)).unwrap(), 0);
        assert!(i64::from_value(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn decimals_convert_exactly() {
        let price: Decimal = "12.50".parse().unwrap();
        assert_eq!(Decimal::from_value(&Value::Text("12.50".into())).unwrap(), price);
        assert_eq!(Decimal::from_value(&Value::Float(12.5)).unwrap(), price);
        assert_eq!(String::from_value(&Value::Decimal(price)).unwrap(), "12.50");
        assert_eq!(i64::from_value(&Value::Decimal("2.5".parse().unwrap())).unwrap(), 2);
        assert!((f64::from_value(&Value::Decimal(price)).unwrap() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn guids_parse_from_text_and_bytes() {
        let key = Uuid::new_v4();
        assert_eq!(Uuid::from_value(&Value::Text(key.to_string())).unwrap(), key);
        assert_eq!(Uuid::from_value(&Value::Blob(key.as_bytes().to_vec())).unwrap(), key);
        assert_eq!(Uuid::from_value(&Value::Guid(key)).unwrap(), key);
        assert!(Uuid::from_value(&Value::Text("not-a-guid".into())).is_err());
    }

    #[test]
    fn bool_accepts_ints_and_words() {
        assert!(bool::from_value(&Value::Int(1)).unwrap());
        assert!(!bool::from_value(&Value::Text("False".into())).unwrap());
    }

    #[test]
    fn timestamp_parses_sqlite_text() {
        let dt = NaiveDateTime::from_value(&Value::Text("2024-01-02 03:04:05".into())).unwrap();
        assert_eq!(dt.format("%F %T").to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn missing_scalar_is_null() {
        assert_eq!(convert_scalar::<Option<String>>(None).unwrap(), None);
        assert!(convert_scalar::<String>(None).is_err());
    }
}
