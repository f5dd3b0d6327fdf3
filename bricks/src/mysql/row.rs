//! MySQL row decoding

use std::sync::Arc;

use mysql_async::{Column, Row as MySqlAsyncRow};

use super::types::from_mysql_value;
use crate::error::{Error, Result};
use crate::row::Row;

/// Column names of a result set, shared by every row decoded from it.
pub(crate) fn header(columns: &[Column]) -> Arc<[String]> {
    columns
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect::<Vec<_>>()
        .into()
}

pub(crate) fn decode_row(row: MySqlAsyncRow, header: &Arc<[String]>) -> Result<Row> {
    let mut values = Vec::with_capacity(row.len());
    for (i, name) in header.iter().enumerate() {
        let raw = row
            .as_ref(i)
            .ok_or_else(|| Error::ColumnNotFound(name.clone()))?
            .clone();
        values.push(from_mysql_value(raw)?);
    }
    Ok(Row::new(Arc::clone(header), values))
}
