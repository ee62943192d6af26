//! Per-connection bidirectional relay.
//!
//! One persistent reader task per direction performs deadline-bounded,
//! size-capped reads and hands chunks to a single coordinating loop, which
//! runs each chunk through the direction's pipeline, writes it to the
//! opposite stream, and re-arms the idle timer. The loop exits on
//! end-of-stream or idle timeout; other read errors are logged and left
//! to the idle timer.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::connection::{self, Connection, RelayLimits};
use super::server::RelayStats;
use crate::service::Service;

/// Direction of travel for one relayed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to backend (the service's source pipeline applies).
    ClientToBackend,
    /// Backend to client (the service's destination pipeline applies).
    BackendToClient,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToBackend => write!(f, "client->backend"),
            Direction::BackendToClient => write!(f, "backend->client"),
        }
    }
}

/// Why the relay loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No traffic in either direction for the idle window.
    IdleTimeout,
    /// One side reached end-of-stream.
    StreamClosed(Direction),
}

/// What a reader task reports when it stops.
enum ReadEnd {
    /// Clean end-of-stream.
    Closed,
    /// Read failure, including an elapsed per-read deadline.
    Failed(io::Error),
}

struct ReaderReport {
    direction: Direction,
    end: ReadEnd,
}

/// Reads one direction until end-of-stream or a read error, pushing each
/// non-empty chunk onto the delivery channel. Reports its exit reason once
/// and terminates; it is spawned exactly once per connection.
async fn pump_reads<R>(
    mut reader: R,
    direction: Direction,
    limits: RelayLimits,
    data_tx: mpsc::Sender<Bytes>,
    report_tx: mpsc::Sender<ReaderReport>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; limits.max_read_bytes];
    loop {
        match connection::read_bounded(&mut reader, &mut buf, &limits).await {
            Ok(0) => {
                let _ = report_tx
                    .send(ReaderReport {
                        direction,
                        end: ReadEnd::Closed,
                    })
                    .await;
                return;
            }
            Ok(n) => {
                if data_tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                    // Coordinator is gone; the connection is being torn down.
                    return;
                }
            }
            Err(e) => {
                let _ = report_tx
                    .send(ReaderReport {
                        direction,
                        end: ReadEnd::Failed(e),
                    })
                    .await;
                return;
            }
        }
    }
}

/// Runs one connection to completion and returns why it ended.
///
/// Consumes the connection; both streams are closed (cascading,
/// best-effort) before returning.
pub(crate) async fn run(
    conn: Connection,
    service: Arc<Service>,
    stats: Arc<RelayStats>,
) -> RelayOutcome {
    let Connection {
        id,
        client,
        backend,
        peer_addr: _,
        limits,
    } = conn;

    let (client_read, mut client_write) = tokio::io::split(client);
    let (backend_read, mut backend_write) = tokio::io::split(backend);

    let (src_tx, mut src_rx) = mpsc::channel::<Bytes>(1);
    let (dst_tx, mut dst_rx) = mpsc::channel::<Bytes>(1);
    let (report_tx, mut report_rx) = mpsc::channel::<ReaderReport>(2);

    let src_reader = tokio::spawn(pump_reads(
        client_read,
        Direction::ClientToBackend,
        limits,
        src_tx,
        report_tx.clone(),
    ));
    let dst_reader = tokio::spawn(pump_reads(
        backend_read,
        Direction::BackendToClient,
        limits,
        dst_tx,
        report_tx,
    ));

    let idle = sleep(limits.idle_timeout);
    tokio::pin!(idle);

    let outcome = loop {
        tokio::select! {
            _ = &mut idle => break RelayOutcome::IdleTimeout,

            Some(chunk) = src_rx.recv() => {
                let data = service.src_pipeline.apply(chunk);
                stats.record_to_backend(data.len() as u64);
                if let Err(e) = connection::write_bounded(&mut backend_write, &data, &limits).await {
                    warn!(conn_id = %id, error = %e, "Error writing to backend");
                }
                idle.as_mut().reset(Instant::now() + limits.idle_timeout);
            }

            Some(chunk) = dst_rx.recv() => {
                let data = service.dst_pipeline.apply(chunk);
                stats.record_to_client(data.len() as u64);
                if let Err(e) = connection::write_bounded(&mut client_write, &data, &limits).await {
                    warn!(conn_id = %id, error = %e, "Error writing to client");
                }
                idle.as_mut().reset(Instant::now() + limits.idle_timeout);
            }

            Some(report) = report_rx.recv() => {
                match report.end {
                    ReadEnd::Closed => {
                        debug!(conn_id = %id, direction = %report.direction, "Stream closed");
                        break RelayOutcome::StreamClosed(report.direction);
                    }
                    // Not terminal on its own; the idle timer is the only
                    // exit for a connection whose reads keep failing.
                    ReadEnd::Failed(e) => {
                        warn!(conn_id = %id, direction = %report.direction, error = %e, "Read error");
                    }
                }
            }
        }
    };

    if let Err(e) = connection::close_cascading(&mut client_write, &mut backend_write).await {
        warn!(conn_id = %id, error = %e, "Error closing connection");
    }
    src_reader.abort();
    dst_reader.abort();

    outcome
}
