//! Completion-callback invocation for execution futures

use std::future::Future;

use futures::future::Map;
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Run an execution future and hand its outcome to a closure.
///
/// Every pool-targeted execution (`run`, `rows`, `val`, `Database::run`,
/// `Database::transaction`, ...) returns a `Send + 'static` future, so the
/// same future serves both styles: `.await` it, or call `.callback(..)`.
/// The closure is invoked exactly once, after the connection was released.
///
/// ```no_run
/// use bricks::{Callback, Executable, SqliteDatabase};
///
/// # async fn demo(db: SqliteDatabase) {
/// db.select("title")
///     .from("item")
///     .col::<String>()
///     .callback(|titles| println!("{:?}", titles))
///     .await
///     .unwrap();
/// # }
/// ```
pub trait Callback<T>: Future<Output = Result<T>> + Send + Sized + 'static
where
    T: Send + 'static,
{
    /// Spawn the future on the current tokio runtime and call `f` with its
    /// result.
    fn callback<F>(self, f: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        tokio::spawn(async move { f(self.await) })
    }
}

impl<T, Fut> Callback<T> for Fut
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
}

/// Completion handler for any execution future, including ones that borrow
/// a scope's [`Client`](crate::Client).
///
/// Nothing is spawned: the returned future runs the execution when it is
/// awaited and then calls `f` with the outcome. Statements built from a
/// client use this form, since their futures cannot outlive the scope.
///
/// ```no_run
/// use bricks::{Executable, OnComplete, SqliteDatabase};
///
/// # async fn demo(db: SqliteDatabase) -> bricks::Result<()> {
/// db.run(|client| {
///     Box::pin(async move {
///         client
///             .select("price")
///             .from("item")
///             .val::<i64>()
///             .on_complete(|price| println!("{:?}", price))
///             .await;
///         Ok(())
///     })
/// })
/// .await
/// # }
/// ```
pub trait OnComplete<T>: Future<Output = Result<T>> + Sized {
    fn on_complete<F>(self, f: F) -> Map<Self, F>
    where
        F: FnOnce(Result<T>),
    {
        self.map(f)
    }
}

impl<T, Fut> OnComplete<T> for Fut where Fut: Future<Output = Result<T>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_callback_receives_value() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        async { Ok::<_, Error>(7) }
            .callback(move |result| {
                let _ = tx.send(result.ok());
            })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_callback_receives_error() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        async { Err::<i64, _>(Error::user("nope")) }
            .callback(move |result| {
                let _ = tx.send(result.map_err(|e| e.to_string()));
            })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), Err("nope".to_string()));
    }

    #[tokio::test]
    async fn test_on_complete_borrows() {
        let base = 40;
        let mut seen = None;
        async { Ok::<_, Error>(base + 2) }
            .on_complete(|result| seen = result.ok())
            .await;
        assert_eq!(seen, Some(42));
    }
}
