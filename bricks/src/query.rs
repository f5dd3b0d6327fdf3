//! Statement builders for bricks
//!
//! The builders render parameterized SQL with `?` placeholders and
//! backtick-quoted identifiers, which both MySQL and SQLite accept. They
//! carry an execution target as a type parameter: a bare builder
//! (`Select`, target `()`) only renders, while builders handed out by
//! [`Database`](crate::Database) or [`Client`](crate::Client) are also
//! [`Executable`](crate::Executable).

use crate::error::{Error, Result};
use crate::result::QueryResult;
use crate::row::Row;
use crate::traits::ToValue;
use crate::value::Value;

/// What executing a built statement amounts to.
#[derive(Debug)]
pub(crate) enum Plan {
    /// Send the text and parameters to the driver.
    Execute { sql: String, params: Vec<Value> },
    /// Complete without touching the database.
    Skip(QueryResult),
    /// Fail before acquiring a connection.
    Reject(Error),
}

impl Plan {
    pub(crate) fn from_sql(rendered: Result<(String, Vec<Value>)>) -> Self {
        match rendered {
            Ok((sql, params)) => Plan::Execute { sql, params },
            Err(err) => Plan::Reject(err),
        }
    }
}

/// Quote a possibly schema-qualified identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| match part {
            "*" => "*".to_string(),
            _ => format!("`{}`", part.replace('`', "``")),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote plain identifiers, pass expressions (`count(*)`, `price AS p`)
/// through verbatim.
fn select_item(item: &str) -> String {
    let plain = item
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '*'));
    if plain {
        quote_ident(item)
    } else {
        item.to_string()
    }
}

/// A projection list accepted by `select`.
///
/// A string is split at top-level commas, so `"title, price"` and
/// `"coalesce(a, b)"` both do what they look like.
pub trait Columns {
    fn into_columns(self) -> Vec<String>;
}

impl Columns for () {
    fn into_columns(self) -> Vec<String> {
        Vec::new()
    }
}

impl Columns for &str {
    fn into_columns(self) -> Vec<String> {
        let mut columns = Vec::new();
        let mut depth = 0_usize;
        let mut start = 0;
        for (i, c) in self.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    columns.push(&self[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        columns.push(&self[start..]);
        columns
            .into_iter()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Columns for String {
    fn into_columns(self) -> Vec<String> {
        self.as_str().into_columns()
    }
}

impl<const N: usize> Columns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|c| c.to_string()).collect()
    }
}

impl Columns for &[&str] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|c| c.to_string()).collect()
    }
}

impl Columns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(String::from).collect()
    }
}

impl Columns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

/// WHERE clauses joined with AND.
#[derive(Debug, Clone, Default)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    fn eq(&mut self, column: &str, value: Value) {
        if value.is_null() {
            self.clauses.push(format!("{} IS NULL", quote_ident(column)));
        } else {
            self.clauses.push(format!("{} = ?", quote_ident(column)));
            self.params.push(value);
        }
    }

    fn raw(&mut self, sql: &str, params: Vec<Value>) {
        self.clauses.push(format!("({})", sql));
        self.params.extend(params);
    }

    fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        if self.clauses.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        sql.push_str(&self.clauses.join(" AND "));
        params.extend(self.params.iter().cloned());
    }
}

/// A `SELECT` statement.
///
/// ```
/// use bricks::query::Select;
///
/// let (sql, params) = Select::new("price")
///     .from("item")
///     .where_eq("title", "apple")
///     .to_sql();
/// assert_eq!(sql, "SELECT `price` FROM `item` WHERE `title` = ?");
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Select<T = ()> {
    pub(crate) target: T,
    columns: Vec<String>,
    table: Option<String>,
    filter: Filter,
    order_by: Vec<String>,
    limit: Option<u64>,
}

impl Select {
    pub fn new(columns: impl Columns) -> Self {
        Self::with_target((), columns)
    }
}

impl<T> Select<T> {
    pub(crate) fn with_target(target: T, columns: impl Columns) -> Self {
        Self {
            target,
            columns: columns.into_columns(),
            table: None,
            filter: Filter::default(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn from(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Require `column = value`. A NULL value renders `IS NULL`.
    pub fn where_eq(mut self, column: &str, value: impl ToValue) -> Self {
        self.filter.eq(column, value.to_value());
        self
    }

    /// Require every `column = value` pair of `conditions`.
    pub fn where_all(mut self, conditions: Row) -> Self {
        for (column, value) in conditions.iter() {
            self.filter.eq(column, value.clone());
        }
        self
    }

    /// Add a raw condition with its own positional parameters.
    pub fn where_raw(mut self, sql: &str, params: Vec<Value>) -> Self {
        self.filter.raw(sql, params);
        self
    }

    /// Append an ORDER BY expression, e.g. `"price DESC"`.
    pub fn order_by(mut self, expr: &str) -> Self {
        self.order_by.push(expr.to_string());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| select_item(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {}", columns);
        let mut params = Vec::new();
        if let Some(table) = &self.table {
            sql.push_str(" FROM ");
            sql.push_str(&quote_ident(table));
        }
        self.filter.render(&mut sql, &mut params);
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        (sql, params)
    }

    pub(crate) fn plan(&self) -> Plan {
        Plan::from_sql(Ok(self.to_sql()))
    }
}

/// A multi-row `INSERT` statement.
///
/// The column list comes from the first row. Later rows are matched by
/// column name and bind NULL for columns they lack.
#[derive(Debug, Clone)]
pub struct Insert<T = ()> {
    pub(crate) target: T,
    table: String,
    rows: Vec<Row>,
}

impl Insert {
    pub fn new(table: &str, rows: impl Into<Vec<Row>>) -> Self {
        Self::with_target((), table, rows)
    }
}

impl<T> Insert<T> {
    pub(crate) fn with_target(target: T, table: &str, rows: impl Into<Vec<Row>>) -> Self {
        Self {
            target,
            table: table.to_string(),
            rows: rows.into(),
        }
    }

    /// Append another row.
    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    /// Render the statement. Fails when there is nothing to insert.
    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let first = self
            .rows
            .first()
            .ok_or_else(|| Error::Query("INSERT without rows".to_string()))?;
        if first.is_empty() {
            return Err(Error::Query("INSERT row without columns".to_string()));
        }

        let columns = first.columns();
        let tuple = format!("({})", vec!["?"; columns.len()].join(", "));
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_ident(&self.table),
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            vec![tuple.as_str(); self.rows.len()].join(", ")
        );

        let mut params = Vec::with_capacity(self.rows.len() * columns.len());
        for row in &self.rows {
            for column in columns {
                params.push(row.value(column).cloned().unwrap_or(Value::Null));
            }
        }
        Ok((sql, params))
    }

    pub(crate) fn plan(&self) -> Plan {
        if self.rows.is_empty() {
            return Plan::Skip(QueryResult::empty("INSERT"));
        }
        Plan::from_sql(self.to_sql())
    }
}

/// An `UPDATE` statement.
#[derive(Debug, Clone)]
pub struct Update<T = ()> {
    pub(crate) target: T,
    table: String,
    changes: Vec<(String, Value)>,
    filter: Filter,
}

impl Update {
    pub fn new(table: &str, changes: Row) -> Self {
        Self::with_target((), table, changes)
    }
}

impl<T> Update<T> {
    pub(crate) fn with_target(target: T, table: &str, changes: Row) -> Self {
        Self {
            target,
            table: table.to_string(),
            changes: changes
                .iter()
                .map(|(c, v)| (c.to_string(), v.clone()))
                .collect(),
            filter: Filter::default(),
        }
    }

    pub fn set(mut self, column: &str, value: impl ToValue) -> Self {
        self.changes.push((column.to_string(), value.to_value()));
        self
    }

    pub fn where_eq(mut self, column: &str, value: impl ToValue) -> Self {
        self.filter.eq(column, value.to_value());
        self
    }

    pub fn where_all(mut self, conditions: Row) -> Self {
        for (column, value) in conditions.iter() {
            self.filter.eq(column, value.clone());
        }
        self
    }

    pub fn where_raw(mut self, sql: &str, params: Vec<Value>) -> Self {
        self.filter.raw(sql, params);
        self
    }

    /// Render the statement. Fails when no column is set.
    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        if self.changes.is_empty() {
            return Err(Error::Query("UPDATE without SET columns".to_string()));
        }
        let assignments = self
            .changes
            .iter()
            .map(|(c, _)| format!("{} = ?", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("UPDATE {} SET {}", quote_ident(&self.table), assignments);
        let mut params: Vec<Value> = self.changes.iter().map(|(_, v)| v.clone()).collect();
        self.filter.render(&mut sql, &mut params);
        Ok((sql, params))
    }

    pub(crate) fn plan(&self) -> Plan {
        Plan::from_sql(self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn test_select_star() {
        let (sql, params) = Select::new(()).from("item").to_sql();
        assert_eq!(sql, "SELECT * FROM `item`");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_column_lists() {
        let (sql, _) = Select::new("title,price").from("item").to_sql();
        assert_eq!(sql, "SELECT `title`, `price` FROM `item`");

        let (sql, _) = Select::new(["item.title", "count(*) AS n"])
            .from("item")
            .to_sql();
        assert_eq!(sql, "SELECT `item`.`title`, count(*) AS n FROM `item`");

        let (sql, _) = Select::new("coalesce(price, 0), title").to_sql();
        assert_eq!(sql, "SELECT coalesce(price, 0), `title`");
    }

    #[test]
    fn test_select_filters_and_tail() {
        let (sql, params) = Select::new("title")
            .from("item")
            .where_all(row! { "title" => "apple", "deleted_at" => None::<i64> })
            .where_raw("price > ? OR price < ?", vec![Value::I64(5), Value::I64(1)])
            .order_by("price DESC")
            .limit(3)
            .to_sql();
        assert_eq!(
            sql,
            "SELECT `title` FROM `item` WHERE `title` = ? AND `deleted_at` IS NULL \
             AND (price > ? OR price < ?) ORDER BY price DESC LIMIT 3"
        );
        assert_eq!(
            params,
            vec![Value::from("apple"), Value::I64(5), Value::I64(1)]
        );
    }

    #[test]
    fn test_quote_ident_escapes_backticks() {
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
        assert_eq!(quote_ident("db.item"), "`db`.`item`");
    }

    #[test]
    fn test_insert_many_rows() {
        let (sql, params) = Insert::new(
            "item",
            vec![
                row! { "title" => "apple", "price" => 10 },
                row! { "price" => 20, "title" => "orange" },
                row! { "title" => "plum" },
            ],
        )
        .to_sql()
        .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `item` (`title`, `price`) VALUES (?, ?), (?, ?), (?, ?)"
        );
        assert_eq!(
            params,
            vec![
                Value::from("apple"),
                Value::I64(10),
                Value::from("orange"),
                Value::I64(20),
                Value::from("plum"),
                Value::Null,
            ]
        );
    }

    #[test]
    fn test_insert_nothing_is_skipped() {
        let insert = Insert::new("item", Vec::<Row>::new());
        assert!(insert.to_sql().is_err());
        match insert.plan() {
            Plan::Skip(result) => {
                assert_eq!(result.command, "INSERT");
                assert_eq!(result.rows_affected, 0);
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_insert_single_row() {
        let (sql, _) = Insert::new("item", row! { "title" => "kiwi" })
            .to_sql()
            .unwrap();
        assert_eq!(sql, "INSERT INTO `item` (`title`) VALUES (?)");
    }

    #[test]
    fn test_update() {
        let (sql, params) = Update::new("item", row! { "price" => 42 })
            .set("title", "green apple")
            .where_eq("title", "apple")
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE `item` SET `price` = ?, `title` = ? WHERE `title` = ?"
        );
        assert_eq!(
            params,
            vec![
                Value::I64(42),
                Value::from("green apple"),
                Value::from("apple")
            ]
        );
    }

    #[test]
    fn test_update_without_changes_is_rejected() {
        let update = Update::new("item", row! {}).where_eq("title", "apple");
        assert!(matches!(update.to_sql(), Err(Error::Query(_))));
        assert!(matches!(update.plan(), Plan::Reject(Error::Query(_))));
    }
}
