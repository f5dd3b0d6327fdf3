//! bricks - scoped database access over pooled connections
//!
//! A thin layer over a connection pool (`mysql_async` for MySQL, `sqlx` for
//! SQLite) that runs statements inside connection and transaction scopes,
//! and hands results back buffered, projected or streamed.
//!
//! # Features
//!
//! - **Scopes**: [`Database::run`] and [`Database::transaction`] hold one
//!   connection for a unit of work and release it on every outcome
//! - **Accessors**: `run`, `rows`, `row`, `col`, `val` and `all` on every
//!   statement via [`Executable`]
//! - **Streams**: [`RowStream`] emits rows as the driver decodes them, then
//!   exactly one terminal event
//! - **Two calling styles**: every execution future can be awaited or given
//!   a completion handler, spawned with [`Callback`] or inline with
//!   [`OnComplete`] for statements on a scope's client
//!
//! # Example
//!
//! ```no_run
//! use bricks::{row, Callback, Executable, SqliteDatabase};
//!
//! # async fn demo() -> bricks::Result<()> {
//! let db = SqliteDatabase::connect("sqlite://shop.db")?;
//!
//! let titles: Vec<String> = db.select("title").from("item").order_by("title").col().await?;
//!
//! db.raw("SELECT count(*) FROM item", vec![])
//!     .val::<i64>()
//!     .callback(|count| println!("{:?}", count));
//!
//! db.transaction(|client| {
//!     Box::pin(async move {
//!         client.insert("item", row! { "title" => "kiwi", "price" => 5 }).run().await?;
//!         Ok(())
//!     })
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod mysql;
pub mod query;
pub mod result;
pub mod row;
pub mod sqlite;
pub mod statement;
pub mod stream;
pub mod traits;
pub mod value;

// Re-export main types
pub use callback::{Callback, OnComplete};
pub use client::Client;
pub use config::{Config, PoolConfig};
pub use database::{Database, DatabaseBuilder, PoolStatus};
pub use error::{Error, Result};
pub use mysql::MySqlDriver;
pub use query::{Columns, Insert, Select, Update};
pub use result::QueryResult;
pub use row::Row;
pub use sqlite::SqliteDriver;
pub use statement::{Executable, Statement, Target};
pub use stream::{BlockingRows, RowStream, StreamEvent};
pub use traits::{Driver, FromRow, FromValue, ToValue};
pub use value::Value;

/// A database over a MySQL pool.
pub type MySqlDatabase = Database<MySqlDriver>;

/// A database over a SQLite pool.
pub type SqliteDatabase = Database<SqliteDriver>;
