//! Buffered statement results and their projections

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::row::Row;
use crate::traits::FromValue;
use crate::value::Value;

/// A fully materialized statement result.
///
/// Produced once per buffered execution. The projections consume it, so a
/// result is never re-read or re-executed.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Upper-cased leading keyword of the statement (`SELECT`, `INSERT`, ...)
    pub command: String,
    /// Column header. May be empty when the backend only reports columns
    /// alongside rows.
    pub columns: Arc<[String]>,
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
}

impl QueryResult {
    /// An empty result for `sql`.
    pub fn empty(sql: &str) -> Self {
        Self {
            command: command_tag(sql),
            columns: Arc::from(Vec::new()),
            rows: Vec::new(),
            rows_affected: 0,
            last_insert_id: None,
        }
    }

    /// Number of columns the statement projected.
    pub fn column_count(&self) -> usize {
        if self.columns.is_empty() {
            self.rows.first().map_or(0, Row::len)
        } else {
            self.columns.len()
        }
    }

    /// First row, if any. Extra rows are ignored.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// First row, or `None` for an empty result.
    pub fn into_first_row(self) -> Option<Row> {
        self.rows.into_iter().next()
    }

    /// Values of the single projected column, in row order.
    pub fn into_column<T: FromValue>(self) -> Result<Vec<T>> {
        self.single_column()?;
        self.rows
            .into_iter()
            .map(|row| {
                let value = row.into_values().into_iter().next().unwrap_or(Value::Null);
                T::from_value(value)
            })
            .collect()
    }

    /// The single value of a one-column, at-most-one-row result.
    ///
    /// Zero rows, or a SQL NULL, give `None`.
    pub fn into_scalar<T: FromValue>(self) -> Result<Option<T>> {
        self.single_column()?;
        if self.rows.len() > 1 {
            return Err(Error::Cardinality {
                expected: "at most one row",
                actual: format!("{} rows", self.rows.len()),
            });
        }
        match self.into_first_row() {
            Some(row) => {
                let value = row.into_values().into_iter().next().unwrap_or(Value::Null);
                Option::<T>::from_value(value)
            }
            None => Ok(None),
        }
    }

    fn single_column(&self) -> Result<()> {
        match self.column_count() {
            1 => Ok(()),
            // nothing selected and nothing returned: an empty projection
            0 if self.rows.is_empty() => Ok(()),
            n => Err(Error::Cardinality {
                expected: "exactly one column",
                actual: format!("{} columns", n),
            }),
        }
    }
}

/// Upper-cased first keyword of a statement.
pub fn command_tag(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .map(|word| {
            word.trim_start_matches('(')
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect::<String>()
                .to_ascii_uppercase()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn result(rows: Vec<Row>) -> QueryResult {
        let columns = rows
            .first()
            .map(|r| Arc::from(r.columns().to_vec()))
            .unwrap_or_else(|| Arc::from(Vec::<String>::new()));
        QueryResult {
            columns,
            rows,
            ..QueryResult::empty("SELECT")
        }
    }

    #[test]
    fn test_command_tag() {
        assert_eq!(command_tag("select 1"), "SELECT");
        assert_eq!(command_tag("  \n insert into t values (1)"), "INSERT");
        assert_eq!(command_tag("(SELECT 1) UNION (SELECT 2)"), "SELECT");
        assert_eq!(command_tag("BEGIN;"), "BEGIN");
        assert_eq!(command_tag(""), "");
    }

    #[test]
    fn test_scalar() {
        let r = result(vec![row! { "price" => 10 }]);
        assert_eq!(r.into_scalar::<i64>().unwrap(), Some(10));

        let r = result(vec![row! { "price" => None::<i64> }]);
        assert_eq!(r.into_scalar::<i64>().unwrap(), None);
    }

    #[test]
    fn test_scalar_on_empty_result_is_none() {
        let mut r = result(vec![]);
        r.columns = vec!["price".to_string()].into();
        assert_eq!(r.into_scalar::<i64>().unwrap(), None);

        // backends that report no header for empty results
        assert_eq!(result(vec![]).into_scalar::<i64>().unwrap(), None);
    }

    #[test]
    fn test_scalar_rejects_many_rows() {
        let r = result(vec![row! { "price" => 10 }, row! { "price" => 20 }]);
        assert!(r.into_scalar::<i64>().unwrap_err().is_cardinality());
    }

    #[test]
    fn test_column() {
        let r = result(vec![row! { "title" => "apple" }, row! { "title" => "orange" }]);
        assert_eq!(r.into_column::<String>().unwrap(), ["apple", "orange"]);
    }

    #[test]
    fn test_column_rejects_many_columns() {
        let r = result(vec![row! { "title" => "apple", "price" => 10 }]);
        let err = r.into_column::<Value>().unwrap_err();
        assert!(err.is_cardinality());

        let mut r = result(vec![]);
        r.columns = vec!["title".to_string(), "price".to_string()].into();
        assert!(r.into_column::<Value>().unwrap_err().is_cardinality());
    }

    #[test]
    fn test_first_row_ignores_extra_rows() {
        let r = result(vec![row! { "title" => "apple" }, row! { "title" => "orange" }]);
        assert_eq!(
            r.into_first_row().unwrap().get::<String>("title").unwrap(),
            "apple"
        );
        assert_eq!(result(vec![]).into_first_row(), None);
    }
}
