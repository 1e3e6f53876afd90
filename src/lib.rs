//! # clamd-client
//!
//! Async client for the ClamAV scanning daemon (clamd) over its TCP or
//! Unix-domain socket control protocol.
//!
//! ## Architecture
//!
//! - **Transport** ([`transport`]): one byte stream over TCP
//!   (`tcp://host:port`, 2 s dial timeout) or a Unix-domain socket
//!   (`unix://path` or a bare path).
//! - **Engine** ([`ClamdConn`]): command framing, length-prefixed
//!   chunk upload, and a per-command background reader task that
//!   parses response lines into a lazy [`ResponseStream`].
//! - **Façade** ([`Clamd`]): `ping`, `version`, `stats`, `reload`,
//!   `shutdown`, the file-scan variants, and cancellable stream
//!   scanning.
//!
//! ## Example
//!
//! ```ignore
//! use clamd_client::{Clamd, EICAR};
//! use tokio::sync::oneshot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), clamd_client::ClamdError> {
//!     let clamd = Clamd::new("tcp://127.0.0.1:3310");
//!     clamd.ping().await?;
//!
//!     let (_cancel, cancel_rx) = oneshot::channel();
//!     let mut responses = clamd.scan_stream(EICAR, cancel_rx).await?;
//!     while let Some(record) = responses.next().await {
//!         println!("{}: {}", record.raw, record.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod transport;

mod client;
mod conn;
mod reader;

pub use client::{Clamd, ClamdStats, EICAR};
pub use conn::ClamdConn;
pub use error::ClamdError;
pub use protocol::{ScanResult, ScanStatus};
pub use reader::{ReadEnd, ResponseStream};
