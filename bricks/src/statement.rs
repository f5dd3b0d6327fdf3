//! Executable statements and their accessors

use std::future::Future;

use futures::future::{self, BoxFuture};
use futures::{FutureExt, TryFutureExt};

use crate::client::Client;
use crate::database::Database;
use crate::error::Result;
use crate::query::{Insert, Plan, Select, Update};
use crate::result::QueryResult;
use crate::row::Row;
use crate::stream::RowStream;
use crate::traits::{Driver, FromRow, FromValue};
use crate::value::Value;

/// Where a statement runs.
pub enum Target<'a, D: Driver> {
    /// Acquire a connection for this one statement and release it after.
    Own(Database<D>),
    /// Run on a connection held by an enclosing scope.
    Borrowed(&'a Client<D>),
}

impl<D: Driver> Clone for Target<'_, D> {
    fn clone(&self) -> Self {
        match self {
            Target::Own(db) => Target::Own(db.clone()),
            Target::Borrowed(client) => Target::Borrowed(*client),
        }
    }
}

/// A statement bound to its target, ready to run.
pub struct Statement<'a, D: Driver> {
    target: Target<'a, D>,
    plan: Plan,
}

impl<'a, D: Driver> Statement<'a, D> {
    pub(crate) fn new(target: Target<'a, D>, plan: Plan) -> Self {
        Self { target, plan }
    }

    pub(crate) fn raw(target: Target<'a, D>, sql: &str, params: Vec<Value>) -> Self {
        Self::new(
            target,
            Plan::Execute {
                sql: sql.to_string(),
                params,
            },
        )
    }

    /// Statement text, unless the statement never reaches the database.
    pub fn sql(&self) -> Option<&str> {
        match &self.plan {
            Plan::Execute { sql, .. } => Some(sql),
            _ => None,
        }
    }

    fn fetch(self) -> BoxFuture<'a, Result<QueryResult>> {
        let (sql, params) = match self.plan {
            Plan::Execute { sql, params } => (sql, params),
            Plan::Skip(result) => return future::ready(Ok(result)).boxed(),
            Plan::Reject(err) => return future::ready(Err(err)).boxed(),
        };
        match self.target {
            Target::Own(db) => db
                .run(move |client| {
                    async move { client.execute(&sql, &params).await }.boxed()
                })
                .boxed(),
            Target::Borrowed(client) => async move { client.execute(&sql, &params).await }.boxed(),
        }
    }

    fn open(self) -> RowStream {
        let (sql, params) = match self.plan {
            Plan::Execute { sql, params } => (sql, params),
            Plan::Skip(_) => return RowStream::finished(Ok(())),
            Plan::Reject(err) => return RowStream::finished(Err(err)),
        };
        match self.target {
            Target::Own(db) => {
                let (sender, rows) = RowStream::channel();
                let sink = sender.clone();
                tokio::spawn(async move {
                    // released before the terminal event is delivered
                    let result = db
                        .run(move |client| {
                            async move { client.produce(&sql, &params, &sink).await }.boxed()
                        })
                        .await;
                    sender.finish(result);
                });
                rows
            }
            Target::Borrowed(client) => client.open(sql, params),
        }
    }
}

/// Execution entry points shared by every statement kind.
///
/// Each method consumes the statement. Pool-targeted statements return
/// `'static` futures that also accept a [`Callback`](crate::Callback).
pub trait Executable<'a, D: Driver>: Sized {
    fn into_statement(self) -> Statement<'a, D>;

    /// Execute and buffer the whole result.
    fn run(self) -> impl Future<Output = Result<QueryResult>> + Send + 'a {
        self.into_statement().fetch()
    }

    /// All rows.
    fn rows(self) -> impl Future<Output = Result<Vec<Row>>> + Send + 'a {
        self.run().map_ok(QueryResult::into_rows)
    }

    /// The first row, or `None` for an empty result.
    fn row(self) -> impl Future<Output = Result<Option<Row>>> + Send + 'a {
        self.run().map_ok(QueryResult::into_first_row)
    }

    /// Every row mapped through [`FromRow`].
    fn all<T>(self) -> impl Future<Output = Result<Vec<T>>> + Send + 'a
    where
        T: FromRow + Send + 'a,
    {
        self.run().map(|result| -> Result<Vec<T>> {
            result?.rows.iter().map(T::from_row).collect()
        })
    }

    /// Values of the single selected column.
    fn col<T>(self) -> impl Future<Output = Result<Vec<T>>> + Send + 'a
    where
        T: FromValue + Send + 'a,
    {
        self.run()
            .map(|result| result.and_then(QueryResult::into_column::<T>))
    }

    /// The single selected value, or `None` for zero rows or NULL.
    fn val<T>(self) -> impl Future<Output = Result<Option<T>>> + Send + 'a
    where
        T: FromValue + Send + 'a,
    {
        self.run()
            .map(|result| result.and_then(QueryResult::into_scalar::<T>))
    }

    /// Stream rows as the driver decodes them.
    fn stream(self) -> RowStream {
        self.into_statement().open()
    }
}

impl<'a, D: Driver> Executable<'a, D> for Statement<'a, D> {
    fn into_statement(self) -> Statement<'a, D> {
        self
    }
}

impl<'a, D: Driver> Executable<'a, D> for Select<Target<'a, D>> {
    fn into_statement(self) -> Statement<'a, D> {
        let plan = self.plan();
        Statement::new(self.target, plan)
    }
}

impl<'a, D: Driver> Executable<'a, D> for Insert<Target<'a, D>> {
    fn into_statement(self) -> Statement<'a, D> {
        let plan = self.plan();
        Statement::new(self.target, plan)
    }
}

impl<'a, D: Driver> Executable<'a, D> for Update<Target<'a, D>> {
    fn into_statement(self) -> Statement<'a, D> {
        let plan = self.plan();
        Statement::new(self.target, plan)
    }
}
