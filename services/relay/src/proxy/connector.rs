//! Backend connectors.
//!
//! A connector produces the backend half of a relayed connection: either a
//! dialed TCP stream or a spawned subprocess whose stdin/stdout act as the
//! byte stream.

use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, ReadBuf};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default timeout for backend connection attempts.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Read/write requirements for a backend byte stream.
pub trait BackendIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> BackendIo for T {}

/// A connected backend stream.
pub type BackendStream = Box<dyn BackendIo>;

/// Capability that produces a backend byte stream for a service.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> io::Result<BackendStream>;
}

/// Dials a TCP backend address.
pub struct SocketConnector {
    addr: String,
    connect_timeout: Duration,
}

impl SocketConnector {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(host: &str, port: u16, connect_timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            connect_timeout,
        }
    }
}

#[async_trait]
impl Connector for SocketConnector {
    async fn connect(&self) -> io::Result<BackendStream> {
        let stream = match timeout(self.connect_timeout, TcpStream::connect(&self.addr)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "connect timeout"));
            }
        };

        debug!(backend_addr = %self.addr, "Connected to backend");
        Ok(Box::new(stream))
    }
}

/// Spawns a subprocess per connection and relays through its stdio.
///
/// The command runs under `sh -c`. Writes feed the child's stdin, reads
/// drain its stdout; stderr is drained line-by-line into the service log.
/// Dropping the stream kills the child.
pub struct CommandConnector {
    command: String,
}

impl CommandConnector {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Connector for CommandConnector {
    async fn connect(&self) -> io::Result<BackendStream> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("child stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout not captured"))?;

        if let Some(stderr) = child.stderr.take() {
            let command = self.command.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(command = %command, line = %line, "Backend stderr");
                }
            });
        }

        debug!(command = %self.command, "Spawned backend command");
        Ok(Box::new(CommandStream {
            _child: child,
            stdin,
            stdout,
        }))
    }
}

/// Byte stream over a spawned child process.
pub struct CommandStream {
    _child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl AsyncRead for CommandStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

impl AsyncWrite for CommandStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stdin).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdin).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdin).poll_shutdown(cx)
    }
}
