//! Error types for clamd-client.

use thiserror::Error;

/// Main error type for all clamd operations.
#[derive(Debug, Error)]
pub enum ClamdError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TCP connect did not complete within the dial timeout.
    ///
    /// Kept distinct from [`ClamdError::Io`] so callers can tell a slow
    /// or blackholed daemon apart from a refused/unreachable one.
    #[error("connecting to {0} timed out")]
    ConnectTimeout(String),

    /// Address could not be resolved to a transport (e.g. a `tcp` URL
    /// without a host or port).
    #[error("invalid daemon address: {0}")]
    InvalidAddress(String),

    /// The daemon answered a single-line command with something other
    /// than the expected acknowledgement.
    #[error("unexpected daemon response: {0:?}")]
    UnexpectedResponse(String),

    /// A zero-length data chunk was passed to the stream upload.
    ///
    /// The zero-length frame is the end-of-stream sentinel and must
    /// never be sent as a data chunk.
    #[error("zero-length chunk is reserved for the end-of-stream sentinel")]
    EmptyChunk,

    /// Connection closed before the expected response arrived.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using ClamdError.
pub type Result<T> = std::result::Result<T, ClamdError>;
