//! SQLite connection pool driver

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Either, Sqlite};

use super::row::{decode_row, header};
use super::types::bind_all;
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::result::QueryResult;
use crate::row::Row;
use crate::traits::Driver;
use crate::value::Value;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A SQLite connection pool backed by `sqlx`.
///
/// The database file is created when missing and opened in WAL mode, so
/// readers on other connections are not blocked by an open write
/// transaction. The pool must be built inside a tokio runtime.
#[derive(Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
    max_size: u32,
}

impl SqliteDriver {
    /// Get a reference to the underlying sqlx pool.
    pub fn inner(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    type Conn = PoolConnection<Sqlite>;

    const NAME: &'static str = "sqlite";

    fn connect(url: &str, config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::Config(format!("Invalid SQLite connection string: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(config.min_idle.unwrap_or(0))
            .acquire_timeout(config.acquire_timeout());
        if let Some(idle) = config.idle_timeout() {
            pool_options = pool_options.idle_timeout(idle);
        }

        Ok(Self {
            pool: pool_options.connect_lazy_with(options),
            max_size: config.pool_size,
        })
    }

    fn max_size(&self) -> u32 {
        self.max_size
    }

    async fn acquire(&self) -> Result<Self::Conn> {
        self.pool
            .acquire()
            .await
            .map_err(|e| Error::Pool(e.to_string()))
    }

    async fn query(
        &self,
        conn: &mut Self::Conn,
        sql: &str,
        params: &[Value],
    ) -> Result<QueryResult> {
        let mut result = QueryResult::empty(sql);
        let mut columns: Option<Arc<[String]>> = None;

        // fetch_many is the only sqlx entry point reporting both rows and
        // the affected-row count of a single statement
        #[allow(deprecated)]
        let mut steps = bind_all(sql, params).fetch_many(&mut **conn);
        while let Some(step) = steps.try_next().await? {
            match step {
                Either::Left(done) => {
                    result.rows_affected += done.rows_affected();
                    if done.rows_affected() > 0 {
                        result.last_insert_id = u64::try_from(done.last_insert_rowid()).ok();
                    }
                }
                Either::Right(row) => {
                    let names = columns.get_or_insert_with(|| header(&row));
                    result.rows.push(decode_row(&row, names)?);
                }
            }
        }

        if let Some(columns) = columns {
            result.columns = columns;
        }
        if !matches!(result.command.as_str(), "INSERT" | "REPLACE") {
            result.last_insert_id = None;
        }
        Ok(result)
    }

    fn stream<'c>(
        &'c self,
        conn: &'c mut Self::Conn,
        sql: &'c str,
        params: &'c [Value],
    ) -> BoxStream<'c, Result<Row>> {
        let mut columns: Option<Arc<[String]>> = None;
        bind_all(sql, params)
            .fetch(&mut **conn)
            .map(move |row| {
                let row = row?;
                let names = columns.get_or_insert_with(|| header(&row));
                decode_row(&row, names)
            })
            .boxed()
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
