//! Connection protocol engine.
//!
//! [`ClamdConn`] owns a single live connection and exposes the
//! protocol primitives the command façade is built on: command
//! sending, chunked stream-upload framing, and response streaming.
//! A connection serves exactly one command and is never shared, so no
//! locking is needed anywhere on this path.

use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

use crate::error::{ClamdError, Result};
use crate::protocol::{command_frame, encode_chunk_header, END_OF_STREAM};
use crate::reader::{spawn_reader_task, ResponseStream};
use crate::transport::{self, DaemonStream};

/// A single live connection to the daemon.
#[derive(Debug)]
pub struct ClamdConn {
    stream: DaemonStream,
}

impl ClamdConn {
    /// Open a connection to the daemon at the given address.
    ///
    /// See [`transport::connect`] for address forms and error cases.
    pub async fn open(address: &str) -> Result<Self> {
        Ok(Self {
            stream: transport::connect(address).await?,
        })
    }

    /// Send a command, framed as `n` + text + newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn send_command(&mut self, command: &str) -> Result<()> {
        tracing::debug!(command, "sending command");
        self.stream.write_all(&command_frame(command)).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Send one data chunk: 4-byte big-endian length prefix + payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClamdError::EmptyChunk`] for a zero-length buffer
    /// (the zero-length frame is the end-of-stream sentinel), or an
    /// I/O error if the write fails.
    pub async fn send_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Err(ClamdError::EmptyChunk);
        }
        let len = u32::try_from(chunk.len())
            .map_err(|_| ClamdError::Io(std::io::Error::other("chunk exceeds u32::MAX bytes")))?;

        self.stream.write_all(&encode_chunk_header(len)).await?;
        self.stream.write_all(chunk).await?;
        Ok(())
    }

    /// Send the end-of-stream sentinel, telling the daemon no more
    /// chunks are coming and to scan the assembled stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn send_eof(&mut self) -> Result<()> {
        self.stream.write_all(&END_OF_STREAM).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Hand the connection to a background reader task and return the
    /// response stream.
    ///
    /// The task closes the connection once the daemon's response is
    /// fully drained (or a read fails); see
    /// [`ResponseStream::finish`](crate::ResponseStream::finish) for
    /// the termination report.
    pub fn read_responses(self) -> ResponseStream {
        spawn_reader_task(self.stream, None)
    }

    /// Like [`read_responses`](Self::read_responses), but the reader
    /// task also stops (closing the connection) when `cancel` fires or
    /// its sender is dropped.
    pub fn read_responses_cancellable(self, cancel: oneshot::Receiver<()>) -> ResponseStream {
        spawn_reader_task(self.stream, Some(cancel))
    }
}
