//! Per-connection state and deadline-bounded stream operations.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use weir_id::ConnectionId;

use super::connector::BackendStream;

/// Process-wide per-connection limits, threaded explicitly through
/// constructors rather than read from ambient state.
#[derive(Debug, Clone, Copy)]
pub struct RelayLimits {
    /// Sliding inactivity window; a connection with no traffic in either
    /// direction for this long is torn down.
    pub idle_timeout: Duration,
    /// Upper bound on the bytes returned by a single read.
    pub max_read_bytes: usize,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10),
            max_read_bytes: 64 * 1024,
        }
    }
}

/// One relayed connection: the accepted client stream coupled with the
/// backend stream produced by the service's connector.
///
/// A connection exists only if both sides were established; it owns both
/// streams exclusively for its lifetime.
pub struct Connection {
    pub id: ConnectionId,
    pub client: TcpStream,
    pub backend: BackendStream,
    pub peer_addr: SocketAddr,
    pub limits: RelayLimits,
}

impl Connection {
    pub fn new(
        client: TcpStream,
        backend: BackendStream,
        peer_addr: SocketAddr,
        limits: RelayLimits,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            client,
            backend,
            peer_addr,
            limits,
        }
    }
}

/// Reads at most `limits.max_read_bytes`, giving up when a fresh
/// "now + idle timeout" deadline passes first. The deadline is re-armed on
/// every call, so it tracks last activity rather than connection start.
pub(crate) async fn read_bounded<R>(
    reader: &mut R,
    buf: &mut [u8],
    limits: &RelayLimits,
) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let cap = buf.len().min(limits.max_read_bytes);
    match timeout(limits.idle_timeout, reader.read(&mut buf[..cap])).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "read deadline elapsed",
        )),
    }
}

/// Writes the whole buffer and flushes, bounded by a fresh idle deadline.
pub(crate) async fn write_bounded<W>(
    writer: &mut W,
    data: &[u8],
    limits: &RelayLimits,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let write_then_flush = async {
        writer.write_all(data).await?;
        writer.flush().await
    };
    match timeout(limits.idle_timeout, write_then_flush).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "write deadline elapsed",
        )),
    }
}

/// Closes both sides, best effort. The client side goes first; the backend
/// side is attempted regardless of the outcome. The first error
/// encountered is the one returned, and each side is attempted exactly
/// once.
pub(crate) async fn close_cascading<A, B>(client: &mut A, backend: &mut B) -> io::Result<()>
where
    A: AsyncWrite + Unpin,
    B: AsyncWrite + Unpin,
{
    let client_result = client.shutdown().await;
    let backend_result = backend.shutdown().await;
    client_result.and(backend_result)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    /// AsyncWrite stub that counts shutdowns and optionally fails them.
    #[derive(Clone, Default)]
    struct RecordingWriter {
        shutdowns: Arc<AtomicUsize>,
        fail_with: Option<&'static str>,
    }

    impl AsyncWrite for RecordingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(message) => Poll::Ready(Err(io::Error::other(message))),
                None => Poll::Ready(Ok(())),
            }
        }
    }

    #[tokio::test]
    async fn close_attempts_both_sides_and_reports_first_error() {
        let mut client = RecordingWriter {
            fail_with: Some("client close failed"),
            ..Default::default()
        };
        let mut backend = RecordingWriter {
            fail_with: Some("backend close failed"),
            ..Default::default()
        };

        let err = close_cascading(&mut client, &mut backend).await.unwrap_err();
        assert_eq!(err.to_string(), "client close failed");

        // The backend side was still attempted, and each side exactly once.
        assert_eq!(client.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(backend.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_reports_backend_error_when_client_succeeds() {
        let mut client = RecordingWriter::default();
        let mut backend = RecordingWriter {
            fail_with: Some("backend close failed"),
            ..Default::default()
        };

        let err = close_cascading(&mut client, &mut backend).await.unwrap_err();
        assert_eq!(err.to_string(), "backend close failed");
        assert_eq!(client.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(backend.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_is_capped_at_max_read_bytes() {
        let limits = RelayLimits {
            idle_timeout: Duration::from_secs(1),
            max_read_bytes: 4,
        };

        let (mut near, mut far) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut far, b"0123456789")
            .await
            .unwrap();

        let mut buf = [0u8; 32];
        let n = read_bounded(&mut near, &mut buf, &limits).await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf[..n], b"0123");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_read_times_out_after_idle_window() {
        let limits = RelayLimits {
            idle_timeout: Duration::from_millis(200),
            max_read_bytes: 1024,
        };

        let (mut near, _far) = tokio::io::duplex(64);
        let mut buf = [0u8; 16];
        let err = read_bounded(&mut near, &mut buf, &limits).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
