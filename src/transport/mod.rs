//! Transport module - TCP and Unix-domain socket handling.
//!
//! Provides one byte-stream type over both transports clamd listens on:
//! - TCP (`tcp://host:port`)
//! - Unix Domain Sockets (`unix://path` or a bare filesystem path)

mod stream;

pub use stream::{connect, DaemonStream, TCP_CONNECT_TIMEOUT};
