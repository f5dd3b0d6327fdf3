//! FromRow trait for mapping database rows to Rust structs

use crate::error::Result;
use crate::row::Row;

/// Trait for types that can be constructed from a database row.
///
/// # Manual Implementation
///
/// ```
/// use bricks::{FromRow, Result, Row};
///
/// pub struct Item {
///     pub title: String,
///     pub price: i64,
/// }
///
/// impl FromRow for Item {
///     fn from_row(row: &Row) -> Result<Self> {
///         Ok(Self {
///             title: row.get("title")?,
///             price: row.get("price")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Construct an instance of this type from a database row.
    fn from_row(row: &Row) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.clone())
    }
}

impl FromRow for serde_json::Value {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.to_json())
    }
}
