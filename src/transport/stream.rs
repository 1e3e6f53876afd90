//! Transport resolution and the connected daemon stream.
//!
//! The address string decides the transport:
//! - `tcp://host:port` dials TCP with a fixed connect timeout
//! - `unix://path` dials the path as a Unix-domain socket
//! - anything else is treated as a Unix socket path (back-compat with
//!   plain `/var/run/clamav/clamd.ctl`-style configuration)
//!
//! # Example
//!
//! ```ignore
//! use clamd_client::transport::connect;
//!
//! let stream = connect("tcp://127.0.0.1:3310").await?;
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, UnixStream};
use url::Url;

use crate::error::{ClamdError, Result};

/// Timeout for establishing TCP connections to the daemon.
///
/// Unix-domain dials are local and carry no timeout.
pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// A connected byte stream to the daemon.
///
/// One connection per command invocation; never reused. The variant is
/// fixed at dial time and callers only see the byte-stream capability.
#[derive(Debug)]
pub enum DaemonStream {
    /// TCP connection (`tcp://` addresses).
    Tcp(TcpStream),
    /// Unix-domain socket connection (`unix://` or bare paths).
    Unix(UnixStream),
}

/// Open a connection to the daemon at the given address.
///
/// # Errors
///
/// Returns [`ClamdError::ConnectTimeout`] when the TCP dial exceeds
/// [`TCP_CONNECT_TIMEOUT`], [`ClamdError::InvalidAddress`] for a `tcp`
/// URL without host or port, and [`ClamdError::Io`] for any other dial
/// failure.
pub async fn connect(address: &str) -> Result<DaemonStream> {
    match Url::parse(address) {
        Ok(url) if url.scheme() == "tcp" => {
            let host = url
                .host_str()
                .ok_or_else(|| ClamdError::InvalidAddress(address.to_string()))?;
            let port = url
                .port()
                .ok_or_else(|| ClamdError::InvalidAddress(address.to_string()))?;

            tracing::debug!(%host, port, "dialing daemon over tcp");

            match tokio::time::timeout(TCP_CONNECT_TIMEOUT, TcpStream::connect((host, port))).await
            {
                Ok(Ok(stream)) => Ok(DaemonStream::Tcp(stream)),
                Ok(Err(e)) => Err(ClamdError::Io(e)),
                Err(_) => Err(ClamdError::ConnectTimeout(address.to_string())),
            }
        }
        Ok(url) if url.scheme() == "unix" => {
            tracing::debug!(path = url.path(), "dialing daemon over unix socket");
            Ok(DaemonStream::Unix(UnixStream::connect(url.path()).await?))
        }
        // No recognized scheme: the whole string is a socket path.
        _ => {
            tracing::debug!(path = address, "dialing daemon over unix socket");
            Ok(DaemonStream::Unix(UnixStream::connect(address).await?))
        }
    }
}

impl AsyncRead for DaemonStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            DaemonStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            DaemonStream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for DaemonStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            DaemonStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            DaemonStream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            DaemonStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            DaemonStream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            DaemonStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            DaemonStream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bare_path_connect_fails_without_listener() {
        let result = connect("/tmp/clamd-client-no-such-socket.sock").await;
        assert!(matches!(result, Err(ClamdError::Io(_))));
    }

    #[tokio::test]
    async fn unix_scheme_connect_fails_without_listener() {
        let result = connect("unix:///tmp/clamd-client-no-such-socket.sock").await;
        assert!(matches!(result, Err(ClamdError::Io(_))));
    }

    #[tokio::test]
    async fn tcp_url_without_port_is_invalid() {
        let result = connect("tcp://localhost").await;
        assert!(matches!(result, Err(ClamdError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn refused_tcp_connect_is_io_not_timeout() {
        // Bind to grab a free port, then drop the listener so the
        // subsequent dial is refused immediately.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = connect(&format!("tcp://127.0.0.1:{port}")).await;
        assert!(matches!(result, Err(ClamdError::Io(_))));
    }

    #[tokio::test]
    async fn unrecognized_scheme_falls_back_to_unix_path() {
        // "localhost:3310" parses as a URL with scheme "localhost",
        // which is not recognized, so the whole string is dialed as a
        // socket path and fails with an I/O error.
        let result = connect("localhost:3310").await;
        assert!(matches!(result, Err(ClamdError::Io(_))));
    }
}
