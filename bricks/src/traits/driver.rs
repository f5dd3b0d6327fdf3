//! Driver trait: the pool and wire-protocol collaborator

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::PoolConfig;
use crate::error::Result;
use crate::result::QueryResult;
use crate::row::Row;
use crate::value::Value;

/// A connection pool plus the statement execution primitives the scopes
/// are built on.
///
/// A driver owns its pool. Connections it hands out are exclusively held by
/// one scope until passed back to [`Driver::release`].
#[async_trait]
pub trait Driver: Send + Sync + Sized + 'static {
    /// A pooled connection checked out of the driver's pool.
    type Conn: Send + 'static;

    /// Short backend name used in log fields.
    const NAME: &'static str;

    /// Build the pool. Connections are opened lazily on first acquire.
    fn connect(url: &str, config: &PoolConfig) -> Result<Self>;

    /// Maximum number of connections the pool will open.
    fn max_size(&self) -> u32;

    /// Check a connection out of the pool.
    ///
    /// Every failure, including an acquire timeout, is an [`Error::Pool`](crate::Error::Pool).
    async fn acquire(&self) -> Result<Self::Conn>;

    /// Hand a connection back to the pool.
    fn release(&self, conn: Self::Conn) {
        drop(conn);
    }

    /// Run a statement to completion and buffer its result.
    async fn query(
        &self,
        conn: &mut Self::Conn,
        sql: &str,
        params: &[Value],
    ) -> Result<QueryResult>;

    /// Run a statement, yielding rows as the driver decodes them.
    fn stream<'c>(
        &'c self,
        conn: &'c mut Self::Conn,
        sql: &'c str,
        params: &'c [Value],
    ) -> BoxStream<'c, Result<Row>>;

    async fn begin(&self, conn: &mut Self::Conn) -> Result<()> {
        self.query(conn, "BEGIN", &[]).await.map(drop)
    }

    async fn commit(&self, conn: &mut Self::Conn) -> Result<()> {
        self.query(conn, "COMMIT", &[]).await.map(drop)
    }

    async fn rollback(&self, conn: &mut Self::Conn) -> Result<()> {
        self.query(conn, "ROLLBACK", &[]).await.map(drop)
    }

    /// Close the pool. Connections still checked out are closed on release.
    async fn close(&self) -> Result<()>;
}
