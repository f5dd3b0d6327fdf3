//! Type conversion utilities for MySQL

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use mysql_async::{Params, Value as MySqlValue};

use crate::error::{Error, Result};
use crate::value::Value;

/// Positional parameters for a prepared statement.
pub(crate) fn to_params(params: &[Value]) -> Params {
    params.iter().map(to_mysql_value).collect::<Vec<_>>().into()
}

/// Convert a bricks Value to a mysql_async Value
pub(crate) fn to_mysql_value(value: &Value) -> MySqlValue {
    match value {
        Value::Null => MySqlValue::NULL,
        Value::Bool(v) => MySqlValue::from(*v),
        Value::I64(v) => MySqlValue::from(*v),
        Value::U64(v) => MySqlValue::from(*v),
        Value::F64(v) => MySqlValue::from(*v),
        Value::String(v) => MySqlValue::from(v.as_str()),
        Value::Bytes(v) => MySqlValue::from(v.as_slice()),
        Value::Date(v) => MySqlValue::Date(v.year() as u16, v.month() as u8, v.day() as u8, 0, 0, 0, 0),
        Value::DateTime(v) => MySqlValue::Date(
            v.year() as u16,
            v.month() as u8,
            v.day() as u8,
            v.hour() as u8,
            v.minute() as u8,
            v.second() as u8,
            v.and_utc().timestamp_subsec_micros(),
        ),
        Value::Time(v) => MySqlValue::Time(
            false,
            0,
            v.hour() as u8,
            v.minute() as u8,
            v.second() as u8,
            v.nanosecond() / 1000,
        ),
        Value::Decimal(v) => MySqlValue::from(v.to_string()),
        Value::Json(v) => MySqlValue::from(v.to_string()),
    }
}

/// Convert a mysql_async Value to a bricks Value
pub(crate) fn from_mysql_value(value: MySqlValue) -> Result<Value> {
    match value {
        MySqlValue::NULL => Ok(Value::Null),
        // text, decimals and JSON arrive as bytes
        MySqlValue::Bytes(v) => match String::from_utf8(v) {
            Ok(s) => Ok(Value::String(s)),
            Err(e) => Ok(Value::Bytes(e.into_bytes())),
        },
        MySqlValue::Int(v) => Ok(Value::I64(v)),
        MySqlValue::UInt(v) => Ok(i64::try_from(v).map_or(Value::U64(v), Value::I64)),
        MySqlValue::Float(v) => Ok(Value::F64(f64::from(v))),
        MySqlValue::Double(v) => Ok(Value::F64(v)),
        MySqlValue::Date(year, month, day, hour, min, sec, micro) => {
            let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).ok_or_else(|| {
                Error::TypeConversion {
                    expected: "date",
                    actual: format!("{}-{}-{}", year, month, day),
                }
            })?;
            if hour == 0 && min == 0 && sec == 0 && micro == 0 {
                return Ok(Value::Date(date));
            }
            let time = NaiveTime::from_hms_micro_opt(hour as u32, min as u32, sec as u32, micro)
                .ok_or_else(|| Error::TypeConversion {
                    expected: "time",
                    actual: format!("{}:{}:{}.{}", hour, min, sec, micro),
                })?;
            Ok(Value::DateTime(NaiveDateTime::new(date, time)))
        }
        MySqlValue::Time(is_neg, days, hours, mins, secs, micro) => {
            // NaiveTime only covers 00:00:00 to 23:59:59
            if is_neg || days > 0 || hours >= 24 {
                return Err(Error::TypeConversion {
                    expected: "time (00:00:00 to 23:59:59)",
                    actual: format!(
                        "{}{}:{:02}:{:02}",
                        if is_neg { "-" } else { "" },
                        days * 24 + hours as u32,
                        mins,
                        secs
                    ),
                });
            }
            let time = NaiveTime::from_hms_micro_opt(hours as u32, mins as u32, secs as u32, micro)
                .ok_or_else(|| Error::TypeConversion {
                    expected: "time",
                    actual: format!("{}:{}:{}.{}", hours, mins, secs, micro),
                })?;
            Ok(Value::Time(time))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_binary_bytes() {
        let text = from_mysql_value(MySqlValue::Bytes(b"apple".to_vec())).unwrap();
        assert_eq!(text, Value::from("apple"));

        let blob = from_mysql_value(MySqlValue::Bytes(vec![0xff, 0xfe])).unwrap();
        assert_eq!(blob, Value::Bytes(vec![0xff, 0xfe]));
    }

    #[test]
    fn test_unsigned_normalised_when_it_fits() {
        assert_eq!(from_mysql_value(MySqlValue::UInt(7)).unwrap(), Value::I64(7));
        assert_eq!(
            from_mysql_value(MySqlValue::UInt(u64::MAX)).unwrap(),
            Value::U64(u64::MAX)
        );
    }

    #[test]
    fn test_date_and_datetime() {
        let date = from_mysql_value(MySqlValue::Date(2024, 2, 29, 0, 0, 0, 0)).unwrap();
        assert_eq!(date, Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));

        let stamp = from_mysql_value(MySqlValue::Date(2024, 2, 29, 13, 5, 0, 250)).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(13, 5, 0, 250)
            .unwrap();
        assert_eq!(stamp, Value::DateTime(expected));
        assert_eq!(to_mysql_value(&stamp), MySqlValue::Date(2024, 2, 29, 13, 5, 0, 250));
    }

    #[test]
    fn test_out_of_range_time_rejected() {
        let err = from_mysql_value(MySqlValue::Time(true, 0, 1, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::TypeConversion { .. }));
    }

    #[test]
    fn test_empty_params() {
        assert!(matches!(to_params(&[]), Params::Empty));
        assert!(matches!(to_params(&[Value::I64(1)]), Params::Positional(ref p) if p.len() == 1));
    }
}
