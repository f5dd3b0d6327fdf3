//! Parameter binding for SQLite

use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use crate::value::Value;

/// Prepare `sql` with every parameter bound in order.
///
/// SQLite has no unsigned, decimal or JSON storage class: out-of-range
/// unsigned integers, decimals and JSON are bound as text.
pub(crate) fn bind_all<'q>(
    sql: &'q str,
    params: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().fold(sqlx::query(sql), bind_value)
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::I64(v) => query.bind(*v),
        Value::U64(v) => match i64::try_from(*v) {
            Ok(v) => query.bind(v),
            Err(_) => query.bind(v.to_string()),
        },
        Value::F64(v) => query.bind(*v),
        Value::String(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Date(v) => query.bind(*v),
        Value::DateTime(v) => query.bind(*v),
        Value::Time(v) => query.bind(*v),
        Value::Decimal(v) => query.bind(v.to_string()),
        Value::Json(v) => query.bind(v.to_string()),
    }
}
