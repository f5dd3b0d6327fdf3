//! Decoded result rows

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::FromValue;
use crate::value::Value;

/// One decoded row: an ordered mapping from column name to [`Value`].
///
/// Rows of the same result share one column header, so cloning a row or
/// building thousands of them does not copy column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from a shared header and values in header order.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Create a row from `(column, value)` pairs, keeping their order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a column's raw value. With duplicate column names the first
    /// occurrence wins.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Decode a column by name.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .value(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
        T::from_value(value.clone())
    }

    /// Decode a column by position.
    pub fn get_index<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| Error::ColumnNotFound(format!("#{}", index)))?;
        T::from_value(value.clone())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row::from_pairs(iter)
    }
}

impl From<Row> for Vec<Row> {
    fn from(row: Row) -> Self {
        vec![row]
    }
}

/// Build a [`Row`] from `column => value` pairs.
///
/// ```
/// use bricks::{row, Value};
///
/// let r = row! { "title" => "apple", "price" => 10 };
/// assert_eq!(r.value("price"), Some(&Value::I64(10)));
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::from_pairs(::std::iter::empty::<(&str, $crate::Value)>())
    };
    ($($column:expr => $value:expr),+ $(,)?) => {
        $crate::Row::from_pairs(::std::vec![
            $((::std::string::String::from($column), $crate::Value::from($value))),+
        ])
    };
}
