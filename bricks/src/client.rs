//! A connection held by a scope

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tracing::{debug, error, warn};

use crate::database::Database;
use crate::error::{Error, Result};
use crate::query::{Columns, Insert, Select, Update};
use crate::result::QueryResult;
use crate::row::Row;
use crate::statement::{Statement, Target};
use crate::stream::{self, RowSender, RowStream};
use crate::traits::Driver;
use crate::value::Value;

type Slot<C> = Arc<Mutex<Option<C>>>;

#[derive(Clone, Copy, Debug)]
enum Control {
    Begin,
    Commit,
    Rollback,
}

impl Control {
    fn as_str(self) -> &'static str {
        match self {
            Control::Begin => "BEGIN",
            Control::Commit => "COMMIT",
            Control::Rollback => "ROLLBACK",
        }
    }
}

/// The connection handed to the work of [`Database::run`] and
/// [`Database::transaction`].
///
/// Statements built from a client run on its connection, in the order they
/// are issued. A stream opened from a client keeps the connection until it
/// has been drained.
pub struct Client<D: Driver> {
    db: Database<D>,
    // Option so the scope can take the connection back exactly once
    conn: Slot<D::Conn>,
    transaction: AtomicBool,
}

impl<D: Driver> Client<D> {
    pub(crate) fn new(db: Database<D>, conn: D::Conn) -> Self {
        Self {
            db,
            conn: Arc::new(Mutex::new(Some(conn))),
            transaction: AtomicBool::new(false),
        }
    }

    /// The database this connection was acquired from.
    ///
    /// Statements built from it acquire their own connections.
    pub fn database(&self) -> &Database<D> {
        &self.db
    }

    /// Whether a transaction is open on this connection.
    pub fn in_transaction(&self) -> bool {
        self.transaction.load(Ordering::SeqCst)
    }

    pub fn select(&self, columns: impl Columns) -> Select<Target<'_, D>> {
        Select::with_target(Target::Borrowed(self), columns)
    }

    pub fn insert(&self, table: &str, rows: impl Into<Vec<Row>>) -> Insert<Target<'_, D>> {
        Insert::with_target(Target::Borrowed(self), table, rows)
    }

    pub fn update(&self, table: &str, changes: Row) -> Update<Target<'_, D>> {
        Update::with_target(Target::Borrowed(self), table, changes)
    }

    pub fn raw(&self, sql: &str, params: Vec<Value>) -> Statement<'_, D> {
        Statement::raw(Target::Borrowed(self), sql, params)
    }

    /// Run `work` inside a transaction on this connection.
    ///
    /// Without an open transaction this issues BEGIN, then COMMIT when
    /// `work` succeeds or ROLLBACK when it fails or panics. Inside an open
    /// transaction `work` simply joins it: no savepoint is created and an
    /// error propagates to the enclosing transaction, which rolls back.
    pub async fn transaction<R, F>(&self, work: F) -> Result<R>
    where
        F: for<'c> FnOnce(&'c Client<D>) -> BoxFuture<'c, Result<R>>,
    {
        if self.in_transaction() {
            return self.guarded(work).await;
        }

        self.control(Control::Begin).await?;
        self.transaction.store(true, Ordering::SeqCst);

        match self.guarded(work).await {
            Ok(value) => match self.control(Control::Commit).await {
                Ok(()) => {
                    self.transaction.store(false, Ordering::SeqCst);
                    Ok(value)
                }
                Err(err) => Err(self.abort(err).await),
            },
            Err(err) => Err(self.abort(err).await),
        }
    }

    /// Run `work`, turning a panic into [`Error::Panic`].
    pub(crate) async fn guarded<R, F>(&self, work: F) -> Result<R>
    where
        F: for<'c> FnOnce(&'c Client<D>) -> BoxFuture<'c, Result<R>>,
    {
        match AssertUnwindSafe(async move { work(self).await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let err = Error::from_panic(payload);
                error!(driver = D::NAME, error = %err, "work panicked");
                Err(err)
            }
        }
    }

    async fn abort(&self, err: Error) -> Error {
        warn!(driver = D::NAME, error = %err, "rolling back transaction");
        let rolled_back = self.control(Control::Rollback).await;
        self.transaction.store(false, Ordering::SeqCst);
        match rolled_back {
            Ok(()) => err,
            Err(rollback) => {
                error!(driver = D::NAME, error = %rollback, "rollback failed");
                Error::Rollback {
                    source: Box::new(err),
                    rollback: Box::new(rollback),
                }
            }
        }
    }

    async fn control(&self, op: Control) -> Result<()> {
        let mut slot = self.lock().await;
        let conn = slot.as_mut().ok_or(Error::Released)?;
        let driver = self.db.driver();
        match op {
            Control::Begin => driver.begin(conn).await?,
            Control::Commit => driver.commit(conn).await?,
            Control::Rollback => driver.rollback(conn).await?,
        }
        debug!(driver = D::NAME, statement = op.as_str(), "transaction control");
        Ok(())
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<D::Conn>> {
        self.conn.lock().await
    }

    pub(crate) async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let mut slot = self.lock().await;
        let conn = slot.as_mut().ok_or(Error::Released)?;
        self.db.driver().query(conn, sql, params).await
    }

    pub(crate) async fn produce(
        &self,
        sql: &str,
        params: &[Value],
        sink: &RowSender,
    ) -> Result<()> {
        let mut slot = self.lock().await;
        let conn = slot.as_mut().ok_or(Error::Released)?;
        stream::produce(self.db.driver(), conn, sql, params, sink).await
    }

    /// Stream on this connection from a spawned task that owns the lock.
    pub(crate) fn open(&self, sql: String, params: Vec<Value>) -> RowStream {
        let (sender, rows) = RowStream::channel();
        let db = self.db.clone();
        // one poll either takes the lock or joins its wait queue, so
        // statements issued after this call run behind the stream
        let mut acquire = Box::pin(Arc::clone(&self.conn).lock_owned());
        let held = (&mut acquire).now_or_never();
        tokio::spawn(async move {
            let mut guard: OwnedMutexGuard<Option<D::Conn>> = match held {
                Some(guard) => guard,
                None => acquire.await,
            };
            let result = match guard.as_mut() {
                Some(conn) => stream::produce(db.driver(), conn, &sql, &params, &sender).await,
                None => Err(Error::Released),
            };
            drop(guard);
            sender.finish(result);
        });
        rows
    }

    /// Take the connection back, waiting for any stream still using it.
    pub(crate) async fn take_conn(&self) -> Option<D::Conn> {
        self.conn.lock().await.take()
    }
}

/// Return a connection abandoned by a dropped scope, rolling back first
/// when it was left inside a transaction.
async fn recover<D: Driver>(db: Database<D>, mut conn: D::Conn, in_transaction: bool) {
    if in_transaction {
        if let Err(err) = db.driver().rollback(&mut conn).await {
            warn!(driver = D::NAME, error = %err, "rollback of abandoned transaction failed");
        }
    }
    db.release(conn);
}

impl<D: Driver> Drop for Client<D> {
    fn drop(&mut self) {
        // only reached with a connection when the scope future was dropped
        let in_transaction = self.in_transaction();
        let handle = tokio::runtime::Handle::try_current();

        match Arc::clone(&self.conn).try_lock_owned() {
            Ok(mut slot) => {
                let Some(conn) = slot.take() else { return };
                match handle {
                    Ok(handle) if in_transaction => {
                        handle.spawn(recover(self.db.clone(), conn, true));
                    }
                    _ => self.db.release(conn),
                }
            }
            // a stream still owns the connection: wait for it to drain
            Err(_) => match handle {
                Ok(handle) => {
                    let slot = Arc::clone(&self.conn);
                    let db = self.db.clone();
                    handle.spawn(async move {
                        let taken = slot.lock_owned().await.take();
                        if let Some(conn) = taken {
                            recover(db, conn, in_transaction).await;
                        }
                    });
                }
                Err(_) => self.db.forget(),
            },
        }
    }
}
