//! Command façade over the protocol engine.
//!
//! [`Clamd`] maps the daemon's named operations onto the engine
//! primitives: one connection is dialed per command, the command is
//! written, and the response arrives as a [`ResponseStream`] fed by a
//! background reader task.
//!
//! # Example
//!
//! ```ignore
//! use clamd_client::Clamd;
//!
//! let clamd = Clamd::new("/var/run/clamav/clamd.ctl");
//! clamd.ping().await?;
//!
//! let mut responses = clamd.scan_file("/home/user/downloads").await?;
//! while let Some(record) = responses.next().await {
//!     println!("{}: {}", record.path, record.status);
//! }
//! ```

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::oneshot;

use crate::conn::ClamdConn;
use crate::error::{ClamdError, Result};
use crate::protocol::CHUNK_SIZE;
use crate::reader::ResponseStream;

/// The EICAR antivirus test file. Not a virus, but detected as one by
/// any working scanner; useful for verifying the daemon end to end.
pub const EICAR: &[u8] = br"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// Client for a ClamAV daemon reachable at a fixed address.
///
/// Holds only the address; every command dials its own connection.
#[derive(Debug, Clone)]
pub struct Clamd {
    address: String,
}

/// Daemon statistics aggregated from a `STATS` response.
///
/// Built by bucketing response lines on their section keyword; the
/// `END` terminator and unrecognized lines are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClamdStats {
    /// Thread pool count (`POOLS:` line, value only).
    pub pools: String,
    /// Daemon state line (`STATE: ...`).
    pub state: String,
    /// Thread info line (`THREADS: ...`).
    pub threads: String,
    /// Scan queue line (`QUEUE: ...`).
    pub queue: String,
    /// Memory usage line (`MEMSTATS: ...`).
    pub memstats: String,
}

impl Clamd {
    /// Create a client for the daemon at `address`.
    ///
    /// The address may be `tcp://host:port`, `unix://path`, or a bare
    /// Unix socket path.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// The configured daemon address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Dial, send one command, and stream the response.
    async fn simple_command(&self, command: &str) -> Result<ResponseStream> {
        let mut conn = ClamdConn::open(&self.address).await?;
        conn.send_command(command).await?;
        Ok(conn.read_responses())
    }

    /// Send a command whose entire response is one acknowledgement line.
    async fn expect_ack(&self, command: &str, ack: &str) -> Result<()> {
        let mut responses = self.simple_command(command).await?;
        match responses.next().await {
            Some(record) if record.raw == ack => Ok(()),
            Some(record) => Err(ClamdError::UnexpectedResponse(record.raw)),
            None => Err(ClamdError::ConnectionClosed),
        }
    }

    /// Check that the daemon is alive (`PING`/`PONG`).
    ///
    /// # Errors
    ///
    /// Returns [`ClamdError::UnexpectedResponse`] if the daemon
    /// answers anything other than `PONG`.
    pub async fn ping(&self) -> Result<()> {
        self.expect_ack("PING", "PONG").await
    }

    /// Ask the daemon to reload its virus databases.
    ///
    /// # Errors
    ///
    /// Returns [`ClamdError::UnexpectedResponse`] if the daemon
    /// answers anything other than `RELOADING`.
    pub async fn reload(&self) -> Result<()> {
        self.expect_ack("RELOAD", "RELOADING").await
    }

    /// Query the daemon's program and database versions.
    pub async fn version(&self) -> Result<ResponseStream> {
        self.simple_command("VERSION").await
    }

    /// Query daemon statistics (thread pools, state, queue, memory).
    pub async fn stats(&self) -> Result<ClamdStats> {
        let mut responses = self.simple_command("STATS").await?;
        let mut stats = ClamdStats::default();

        while let Some(record) = responses.next().await {
            let raw = record.raw;
            if let Some(pools) = raw.strip_prefix("POOLS:") {
                stats.pools = pools.trim().to_string();
            } else if raw.starts_with("STATE") {
                stats.state = raw;
            } else if raw.starts_with("THREADS") {
                stats.threads = raw;
            } else if raw.starts_with("QUEUE") {
                stats.queue = raw;
            } else if raw.starts_with("MEMSTATS") {
                stats.memstats = raw;
            }
            // END terminator and unrecognized lines are dropped.
        }

        Ok(stats)
    }

    /// Instruct the daemon to shut down. Fire-and-forget; only a
    /// transport error is surfaced.
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.simple_command("SHUTDOWN").await?;
        Ok(())
    }

    /// Scan a file or directory (recursively), archives enabled.
    pub async fn scan_file(&self, path: &str) -> Result<ResponseStream> {
        self.simple_command(&format!("SCAN {path}")).await
    }

    /// Scan without archive and special file support.
    pub async fn raw_scan_file(&self, path: &str) -> Result<ResponseStream> {
        self.simple_command(&format!("RAWSCAN {path}")).await
    }

    /// Scan a directory recursively using multiple daemon threads.
    pub async fn multi_scan_file(&self, path: &str) -> Result<ResponseStream> {
        self.simple_command(&format!("MULTISCAN {path}")).await
    }

    /// Scan and keep going after the first match.
    pub async fn cont_scan_file(&self, path: &str) -> Result<ResponseStream> {
        self.simple_command(&format!("CONTSCAN {path}")).await
    }

    /// Scan, keep going after matches, and report every match.
    pub async fn all_match_scan_file(&self, path: &str) -> Result<ResponseStream> {
        self.simple_command(&format!("ALLMATCHSCAN {path}")).await
    }

    /// Scan a byte stream in place, without a temporary file.
    ///
    /// The source is relayed to the daemon in [`CHUNK_SIZE`]-byte
    /// length-prefixed chunks until exhausted, then the end-of-stream
    /// sentinel is sent and the daemon's verdict arrives on the
    /// returned stream. Do not exceed the daemon's configured
    /// `StreamMaxLength`, or it replies with a size-limit error and
    /// closes the connection.
    ///
    /// Firing `cancel` (or dropping its sender) closes the connection:
    /// mid-upload this returns an already-ended stream with
    /// [`ReadEnd::Cancelled`](crate::ReadEnd::Cancelled); during the
    /// read phase it ends the stream with no further records.
    ///
    /// # Errors
    ///
    /// Returns an error if dialing, reading the source, or writing to
    /// the daemon fails.
    pub async fn scan_stream<R>(
        &self,
        mut source: R,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<ResponseStream>
    where
        R: AsyncRead + Unpin,
    {
        let mut conn = ClamdConn::open(&self.address).await?;
        conn.send_command("INSTREAM").await?;

        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = tokio::select! {
                _ = &mut cancel => return Ok(ResponseStream::cancelled()),
                read = source.read(&mut buf) => read.map_err(ClamdError::Io)?,
            };
            if n == 0 {
                break;
            }

            tokio::select! {
                _ = &mut cancel => return Ok(ResponseStream::cancelled()),
                sent = conn.send_chunk(&buf[..n]) => sent?,
            }
        }

        conn.send_eof().await?;
        Ok(conn.read_responses_cancellable(cancel))
    }
}
