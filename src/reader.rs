//! Dedicated reader task for streaming daemon responses.
//!
//! Each in-flight command gets one background task that owns the
//! connection's receive side exclusively and publishes parsed records
//! into a capacity-1 mpsc channel:
//!
//! ```text
//! Daemon ─► Reader Task ─► mpsc::Receiver<ScanResult> ─► Consumer
//! ```
//!
//! The capacity-1 channel suspends the reader until the consumer takes
//! each record, so the daemon's socket buffer governs how far ahead
//! the reader can run. Records arrive in exact daemon line order with
//! at most one in flight.
//!
//! How the loop ended is reported out-of-band on a oneshot channel as
//! a [`ReadEnd`], so "daemon finished" is distinguishable from
//! "connection dropped mid-response" without turning a single bad read
//! into a failed call.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot};

use crate::protocol::{parse_response_line, ScanResult};

/// How a response read loop terminated.
#[derive(Debug)]
pub enum ReadEnd {
    /// The daemon ended its response (clean end-of-stream), or the
    /// consumer dropped the stream before the response finished.
    Drained,
    /// The cancellation signal fired and the connection was closed.
    Cancelled,
    /// A read failed before end-of-stream; the connection state is
    /// unknown and the record sequence was closed at that point.
    Failed(std::io::Error),
}

impl ReadEnd {
    /// Whether the loop saw a clean end-of-stream.
    pub fn is_drained(&self) -> bool {
        matches!(self, ReadEnd::Drained)
    }
}

/// Lazy, ordered sequence of parsed response records.
///
/// Produced by [`ClamdConn::read_responses`](crate::ClamdConn::read_responses);
/// the underlying connection is owned by the reader task and closed
/// once the loop ends, which is after the daemon's bytes are drained.
#[derive(Debug)]
pub struct ResponseStream {
    records: mpsc::Receiver<ScanResult>,
    done: oneshot::Receiver<ReadEnd>,
}

impl ResponseStream {
    /// Receive the next record, or `None` once the response is over.
    pub async fn next(&mut self) -> Option<ScanResult> {
        self.records.recv().await
    }

    /// Drain any remaining records and report how the read loop ended.
    pub async fn finish(mut self) -> ReadEnd {
        while self.records.recv().await.is_some() {}
        self.done.await.unwrap_or_else(|_| {
            ReadEnd::Failed(std::io::Error::other("reader task stopped unexpectedly"))
        })
    }

    /// Collect all remaining records.
    pub async fn collect(mut self) -> Vec<ScanResult> {
        let mut records = Vec::new();
        while let Some(record) = self.records.recv().await {
            records.push(record);
        }
        records
    }

    /// A stream that was cancelled before any response could be read.
    pub(crate) fn cancelled() -> Self {
        let (records_tx, records) = mpsc::channel(1);
        drop(records_tx);
        let (done_tx, done) = oneshot::channel();
        let _ = done_tx.send(ReadEnd::Cancelled);
        Self { records, done }
    }
}

/// Spawn the reader task over the connection's receive side.
///
/// The task owns `stream` and drops it when the loop ends. When
/// `cancel` is supplied, its firing (or the drop of its sender) stops
/// the loop and thereby closes the connection.
pub(crate) fn spawn_reader_task<S>(
    stream: S,
    cancel: Option<oneshot::Receiver<()>>,
) -> ResponseStream
where
    S: AsyncRead + Send + Unpin + 'static,
{
    let (records_tx, records) = mpsc::channel(1);
    let (done_tx, done) = oneshot::channel();

    tokio::spawn(async move {
        let end = read_loop(stream, records_tx, cancel).await;
        if let ReadEnd::Failed(e) = &end {
            tracing::error!("response read loop failed: {}", e);
        }
        let _ = done_tx.send(end);
    });

    ResponseStream { records, done }
}

/// Read newline-terminated lines, parse each, hand records off.
async fn read_loop<S>(
    stream: S,
    records_tx: mpsc::Sender<ScanResult>,
    mut cancel: Option<oneshot::Receiver<()>>,
) -> ReadEnd
where
    S: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();

        let read = match cancel.as_mut() {
            Some(signal) => tokio::select! {
                _ = signal => return ReadEnd::Cancelled,
                read = reader.read_line(&mut line) => read,
            },
            None => reader.read_line(&mut line).await,
        };

        match read {
            Ok(0) => {
                tracing::debug!("daemon ended response");
                return ReadEnd::Drained;
            }
            Ok(_) => {
                let record = parse_response_line(line.trim_end_matches([' ', '\t', '\r', '\n']));
                if records_tx.send(record).await.is_err() {
                    // Consumer hung up; stop reading.
                    return ReadEnd::Drained;
                }
            }
            Err(e) => return ReadEnd::Failed(e),
        }
    }
}
