//! Row streams
//!
//! A streamed statement runs on a spawned task that pushes decoded rows into
//! an unbounded channel, so a slow consumer never stalls the connection.
//! The producer finishes with exactly one terminal event.

use std::future::poll_fn;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::stream::FusedStream;
use futures::{Sink, SinkExt, Stream, TryStreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::row::Row;
use crate::traits::Driver;
use crate::value::Value;

/// One event of a row stream: rows, then a single `End` or `Error`.
#[derive(Debug)]
pub enum StreamEvent {
    Row(Row),
    End,
    Error(Error),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Row(_))
    }
}

/// Producer half of a [`RowStream`].
#[derive(Clone)]
pub(crate) struct RowSender {
    tx: UnboundedSender<StreamEvent>,
}

impl RowSender {
    /// Push a row. Returns false once the consumer is gone.
    pub(crate) fn row(&self, row: Row) -> bool {
        self.tx.send(StreamEvent::Row(row)).is_ok()
    }

    /// Emit the terminal event.
    pub(crate) fn finish(self, result: Result<()>) {
        let event = match result {
            Ok(()) => StreamEvent::End,
            Err(err) => StreamEvent::Error(err),
        };
        let _ = self.tx.send(event);
    }
}

/// An in-flight streaming execution.
///
/// Consume it as a [`futures::Stream`] of `Result<Row>`, with
/// [`subscribe`](RowStream::subscribe), [`pipe`](RowStream::pipe) or
/// [`blocking_iter`](RowStream::blocking_iter). After an error nothing
/// else is yielded; a clean end simply stops the stream. The sequence is
/// not restartable.
pub struct RowStream {
    rx: UnboundedReceiver<StreamEvent>,
    done: bool,
}

impl RowStream {
    pub(crate) fn channel() -> (RowSender, RowStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RowSender { tx }, RowStream { rx, done: false })
    }

    /// A stream that ends immediately with `result`.
    pub(crate) fn finished(result: Result<()>) -> RowStream {
        let (sender, stream) = Self::channel();
        sender.finish(result);
        stream
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        if self.done {
            return Poll::Ready(None);
        }
        // a producer that vanished without saying so is an error, not an end
        let event = ready!(self.rx.poll_recv(cx))
            .unwrap_or(StreamEvent::Error(Error::StreamAborted));
        if event.is_terminal() {
            self.done = true;
            self.rx.close();
        }
        Poll::Ready(Some(event))
    }

    /// Next event, or `None` after the terminal event was delivered.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        poll_fn(|cx| self.poll_event(cx)).await
    }

    /// Deliver every event to `handler` on a spawned task.
    pub fn subscribe<F>(mut self, mut handler: F) -> JoinHandle<()>
    where
        F: FnMut(StreamEvent) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(event) = self.next_event().await {
                handler(event);
            }
        })
    }

    /// Forward rows into `sink`, closing it after the last row.
    ///
    /// A stream error is returned without closing the sink. A sink error
    /// stops forwarding and is returned as [`Error::Sink`].
    pub async fn pipe<S>(mut self, mut sink: S) -> Result<()>
    where
        S: Sink<Row> + Unpin,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        while let Some(event) = self.next_event().await {
            match event {
                StreamEvent::Row(row) => sink.send(row).await.map_err(sink_error)?,
                StreamEvent::End => return sink.close().await.map_err(sink_error),
                StreamEvent::Error(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Collect all rows, failing on the first error.
    pub async fn collect_rows(self) -> Result<Vec<Row>> {
        self.try_collect().await
    }

    /// Iterate rows from synchronous code.
    ///
    /// Blocks the calling thread, so it must not be used on an async worker
    /// thread; use it from `spawn_blocking` or a plain thread.
    pub fn blocking_iter(self) -> BlockingRows {
        BlockingRows { stream: self }
    }
}

fn sink_error<E>(err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::Sink(Box::new(err))
}

impl Stream for RowStream {
    type Item = Result<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_event(cx).map(|event| match event? {
            StreamEvent::Row(row) => Some(Ok(row)),
            StreamEvent::End => None,
            StreamEvent::Error(err) => Some(Err(err)),
        })
    }
}

impl FusedStream for RowStream {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

/// Synchronous iterator over a [`RowStream`].
pub struct BlockingRows {
    stream: RowStream,
}

impl Iterator for BlockingRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stream.done {
            return None;
        }
        let event = self
            .stream
            .rx
            .blocking_recv()
            .unwrap_or(StreamEvent::Error(Error::StreamAborted));
        if event.is_terminal() {
            self.stream.done = true;
        }
        match event {
            StreamEvent::Row(row) => Some(Ok(row)),
            StreamEvent::End => None,
            StreamEvent::Error(err) => Some(Err(err)),
        }
    }
}

/// Run `sql` on `conn` and push its rows into `sink`.
///
/// Rows keep being drained after the consumer hangs up, so the connection
/// is left without a half-read result.
pub(crate) async fn produce<D: Driver>(
    driver: &D,
    conn: &mut D::Conn,
    sql: &str,
    params: &[Value],
    sink: &RowSender,
) -> Result<()> {
    let mut rows = driver.stream(conn, sql, params);
    let mut delivered = 0_u64;
    let mut listening = true;
    while let Some(row) = rows.try_next().await? {
        if listening {
            listening = sink.row(row);
            delivered += 1;
        }
    }
    debug!(driver = D::NAME, rows = delivered, listening, "row stream drained");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_rows_then_end() {
        let (sender, mut stream) = RowStream::channel();
        assert!(sender.row(row! { "n" => 1 }));
        assert!(sender.row(row! { "n" => 2 }));
        sender.finish(Ok(()));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.get::<i64>("n").unwrap(), 1);
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.is_none());
        assert!(stream.is_terminated());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_error_is_final() {
        let (sender, stream) = RowStream::channel();
        sender.row(row! { "n" => 1 });
        sender.clone().finish(Err(Error::Query("boom".into())));
        sender.finish(Ok(()));

        let items: Vec<Result<Row>> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(Error::Query(_))));
    }

    #[tokio::test]
    async fn test_dropped_producer_aborts() {
        let (sender, mut stream) = RowStream::channel();
        sender.row(row! { "n" => 1 });
        drop(sender);

        assert!(matches!(stream.next_event().await, Some(StreamEvent::Row(_))));
        assert!(matches!(
            stream.next_event().await,
            Some(StreamEvent::Error(Error::StreamAborted))
        ));
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_pipe_into_vec() {
        let (sender, stream) = RowStream::channel();
        sender.row(row! { "n" => 1 });
        sender.row(row! { "n" => 2 });
        sender.finish(Ok(()));

        let mut rows: Vec<Row> = Vec::new();
        stream.pipe(&mut rows).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_subscribe_sees_one_terminal_event() {
        let (sender, stream) = RowStream::channel();
        sender.row(row! { "n" => 1 });
        sender.finish(Ok(()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        stream
            .subscribe(move |event| {
                let _ = tx.send(event.is_terminal());
            })
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Some(terminal) = rx.recv().await {
            seen.push(terminal);
        }
        assert_eq!(seen, [false, true]);
    }

    #[tokio::test]
    async fn test_finished_stream() {
        let rows = RowStream::finished(Ok(())).collect_rows().await.unwrap();
        assert!(rows.is_empty());
    }
}
