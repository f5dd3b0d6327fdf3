//! FromValue trait for converting database values to Rust types

use crate::error::{Error, Result};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Trait for types that can be constructed from a database value.
///
/// This is automatically implemented for common Rust types and can
/// be manually implemented for custom types (e.g., enums).
pub trait FromValue: Sized {
    /// Convert a database value to this type.
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    Error::TypeConversion {
        expected,
        actual: value.type_name().to_string(),
    }
}

/// Widen any integral representation so each target type only has to
/// range-check once. MySQL hands DECIMAL and BIGINT UNSIGNED back as text.
fn integral(value: &Value, expected: &'static str) -> Result<i128> {
    match value {
        Value::I64(v) => Ok(i128::from(*v)),
        Value::U64(v) => Ok(i128::from(*v)),
        Value::Bool(v) => Ok(i128::from(*v)),
        Value::Decimal(d) if d.fract().is_zero() => {
            d.to_i128().ok_or_else(|| mismatch(expected, value))
        }
        Value::String(s) => s.trim().parse().map_err(|_| Error::TypeConversion {
            expected,
            actual: format!("non-integer string {:?}", s),
        }),
        _ => Err(mismatch(expected, value)),
    }
}

macro_rules! integer_from_value {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self> {
                    let wide = integral(&value, stringify!($t))?;
                    <$t>::try_from(wide).map_err(|_| Error::TypeConversion {
                        expected: stringify!($t),
                        actual: format!("{}({}) out of range", value.type_name(), wide),
                    })
                }
            }
        )*
    };
}

integer_from_value!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::I64(v) => Ok(v != 0),
            Value::U64(v) => Ok(v != 0),
            _ => Err(mismatch("bool", &value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::F64(v) => Ok(v),
            Value::I64(v) => Ok(v as f64),
            Value::U64(v) => Ok(v as f64),
            Value::Decimal(v) => v.to_f64().ok_or_else(|| mismatch("f64", &value)),
            Value::String(ref v) => v.trim().parse().map_err(|_| mismatch("f64", &value)),
            _ => Err(mismatch("f64", &value)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(v) => Ok(v),
            Value::Bytes(v) => String::from_utf8(v).map_err(|e| Error::TypeConversion {
                expected: "utf8 string",
                actual: format!("invalid utf8: {}", e),
            }),
            _ => Err(mismatch("string", &value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::String(v) => Ok(v.into_bytes()),
            _ => Err(mismatch("bytes", &value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(v) => Ok(v),
            Value::DateTime(v) => Ok(v.date()),
            Value::String(ref v) => v.parse().map_err(|_| mismatch("date", &value)),
            _ => Err(mismatch("date", &value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Date(v) => v
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| mismatch("datetime", &value)),
            // SQLite stores timestamps as text
            Value::String(ref v) => NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| v.parse())
                .map_err(|_| mismatch("datetime", &value)),
            _ => Err(mismatch("datetime", &value)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(v) => Ok(v),
            Value::DateTime(v) => Ok(v.time()),
            Value::String(ref v) => v.parse().map_err(|_| mismatch("time", &value)),
            _ => Err(mismatch("time", &value)),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(v) => Ok(v),
            Value::I64(v) => Ok(Decimal::from(v)),
            Value::U64(v) => Ok(Decimal::from(v)),
            Value::F64(v) => Decimal::try_from(v).map_err(|_| mismatch("decimal", &value)),
            Value::String(v) => v.parse().map_err(|_| Error::TypeConversion {
                expected: "decimal",
                actual: format!("invalid decimal string: {}", v),
            }),
            _ => Err(mismatch("decimal", &value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(v) => Ok(v),
            Value::String(v) => serde_json::from_str(&v).map_err(|e| Error::TypeConversion {
                expected: "json",
                actual: format!("invalid json: {}", e),
            }),
            other => Ok(other.to_json()),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

// Implement for Option<T>
impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_value(value)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_range_checks() {
        assert_eq!(i32::from_value(Value::I64(42)).unwrap(), 42);
        assert_eq!(u8::from_value(Value::I64(255)).unwrap(), 255);
        assert!(u8::from_value(Value::I64(256)).is_err());
        assert!(u32::from_value(Value::I64(-1)).is_err());
        assert_eq!(u64::from_value(Value::U64(u64::MAX)).unwrap(), u64::MAX);
        assert!(i64::from_value(Value::U64(u64::MAX)).is_err());
    }

    #[test]
    fn test_integer_from_text() {
        assert_eq!(i64::from_value(Value::String(" 17 ".into())).unwrap(), 17);
        assert!(i64::from_value(Value::String("x".into())).is_err());
        assert_eq!(
            i64::from_value(Value::Decimal(Decimal::new(1000, 2))).unwrap(),
            10
        );
        assert!(i64::from_value(Value::Decimal(Decimal::new(1050, 2))).is_err());
    }

    #[test]
    fn test_bool_from_integer() {
        assert!(bool::from_value(Value::I64(1)).unwrap());
        assert!(!bool::from_value(Value::I64(0)).unwrap());
        assert!(bool::from_value(Value::String("true".into())).is_err());
    }

    #[test]
    fn test_option_and_null() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(Value::I64(3)).unwrap(), Some(3));
        assert!(i64::from_value(Value::Null).is_err());
    }

    #[test]
    fn test_datetime_from_sqlite_text() {
        let dt = NaiveDateTime::from_value(Value::String("2024-01-02 03:04:05".into())).unwrap();
        assert_eq!(dt.to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn test_json_from_scalar() {
        assert_eq!(
            serde_json::Value::from_value(Value::I64(7)).unwrap(),
            serde_json::json!(7)
        );
        assert_eq!(
            serde_json::Value::from_value(Value::String("{\"a\":1}".into())).unwrap(),
            serde_json::json!({"a": 1})
        );
    }
}
