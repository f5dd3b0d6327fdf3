//! SQLite row decoding

use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Column names of a driver row, shared by every row of its result.
pub(crate) fn header(row: &SqliteRow) -> Arc<[String]> {
    row.columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>()
        .into()
}

/// Decode by the storage class of each value rather than the declared
/// column type, which SQLite does not enforce.
pub(crate) fn decode_row(row: &SqliteRow, header: &Arc<[String]>) -> Result<Row> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let value = match raw.type_info().name() {
            "INTEGER" => Value::I64(row.try_get_unchecked::<i64, _>(idx)?),
            "REAL" => Value::F64(row.try_get_unchecked::<f64, _>(idx)?),
            "BLOB" => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
            _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
        };
        values.push(value);
    }
    Ok(Row::new(Arc::clone(header), values))
}
