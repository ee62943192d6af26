//! Per-service server: accept loop, connection registry, graceful
//! shutdown.

use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

use weir_id::ConnectionId;

use super::connection::{Connection, RelayLimits};
use super::relay;
use crate::error::RelayError;
use crate::service::Service;

/// Interval between active-connection polls while draining.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Backoff after a failed accept, to avoid a tight error loop.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Counters for one service's relay traffic.
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Total connections accepted and fully established.
    pub connections_accepted: AtomicU64,
    /// Connections currently relaying.
    pub connections_active: AtomicU64,
    /// Connections torn down.
    pub connections_closed: AtomicU64,
    /// Backend connection attempts that failed.
    pub backend_failed: AtomicU64,
    /// Bytes written toward the backend (after the source pipeline).
    pub bytes_to_backend: AtomicU64,
    /// Bytes written toward the client (after the destination pipeline).
    pub bytes_to_client: AtomicU64,
}

impl RelayStats {
    pub(crate) fn record_to_backend(&self, bytes: u64) {
        self.bytes_to_backend.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_to_client(&self, bytes: u64) {
        self.bytes_to_client.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// Mutable server state behind one lock: the registry of live connection
/// identities, the shutdown flag, and the listener handed to `serve`.
struct ServerState {
    conns: HashSet<ConnectionId>,
    shutting_down: bool,
    listener: Option<TcpListener>,
}

/// Owns one service's listening socket and its active connections.
///
/// Lifecycle: `bind` → `serve` (accept loop) → `shutdown` (stop accepting,
/// wait for drain). Exactly one server exists per service.
pub struct ServiceServer {
    service: Arc<Service>,
    limits: RelayLimits,
    local_addr: SocketAddr,
    state: Mutex<ServerState>,
    shutdown_tx: watch::Sender<bool>,
    stats: Arc<RelayStats>,
}

impl ServiceServer {
    /// Binds the service's listen address. The server is running once this
    /// returns; call `serve` to start accepting.
    pub async fn bind(service: Arc<Service>, limits: RelayLimits) -> io::Result<Self> {
        let listener = TcpListener::bind(service.listen_addr.as_str()).await?;
        let local_addr = listener.local_addr()?;

        info!(
            service = %service.name,
            service_id = %service.id,
            addr = %local_addr,
            "Server bound"
        );

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            service,
            limits,
            local_addr,
            state: Mutex::new(ServerState {
                conns: HashSet::new(),
                shutting_down: false,
                listener: Some(listener),
            }),
            shutdown_tx,
            stats: Arc::new(RelayStats::default()),
        })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The service this server fronts.
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Traffic counters.
    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Number of connections currently relaying.
    pub fn active_connections(&self) -> usize {
        self.state.lock().conns.len()
    }

    fn register(&self, id: ConnectionId) {
        self.state.lock().conns.insert(id);
        self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    fn deregister(&self, id: ConnectionId) {
        self.state.lock().conns.remove(&id);
        self.stats.connections_active.fetch_sub(1, Ordering::Relaxed);
        self.stats.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Accepts connections until shutdown is requested.
    ///
    /// Accept errors are logged and retried after a short backoff; a failed
    /// backend connection drops that client and keeps accepting. Each
    /// established connection runs in its own task and never blocks the
    /// accept loop.
    pub async fn serve(self: Arc<Self>) -> io::Result<()> {
        let Some(listener) = self.state.lock().listener.take() else {
            return Ok(());
        };
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(service = %self.service.name, addr = %self.local_addr, "Server started");

        loop {
            if self.state.lock().shutting_down {
                break;
            }

            let accepted = tokio::select! {
                _ = shutdown_rx.changed() => break,
                accepted = listener.accept() => accepted,
            };

            let (client, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!(service = %self.service.name, error = %e, "Accept error");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };

            debug!(service = %self.service.name, peer = %peer_addr, "Accepted connection");

            let backend = match self.service.connector.connect().await {
                Ok(backend) => backend,
                Err(e) => {
                    self.stats.backend_failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        service = %self.service.name,
                        error = %e,
                        "Error opening backend connection"
                    );
                    drop(client);
                    continue;
                }
            };

            let conn = Connection::new(client, backend, peer_addr, self.limits);
            let conn_id = conn.id;
            self.register(conn_id);

            let server = Arc::clone(&self);
            let span = info_span!(
                "connection",
                service = %self.service.name,
                conn_id = %conn_id,
                peer = %peer_addr
            );
            tokio::spawn(
                async move {
                    let outcome =
                        relay::run(conn, Arc::clone(&server.service), Arc::clone(&server.stats))
                            .await;
                    debug!(outcome = ?outcome, "Connection finished");
                    server.deregister(conn_id);
                }
                .instrument(span),
            );
        }

        // Dropping the listener closes the socket; no further accepts.
        drop(listener);
        info!(service = %self.service.name, "Server stopped accepting");
        Ok(())
    }

    /// Requests shutdown and waits for active connections to drain.
    ///
    /// Stops the accept loop immediately, then polls the registry until it
    /// empties (Ok) or the deadline passes (ShutdownTimeout). Live
    /// connections are never closed forcibly; they end via idle timeout or
    /// peer close.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), RelayError> {
        self.state.lock().shutting_down = true;
        let _ = self.shutdown_tx.send(true);

        info!(service = %self.service.name, "Shutting down server");

        let give_up_at = Instant::now() + deadline;
        let mut ticker = tokio::time::interval(DRAIN_POLL_INTERVAL);
        loop {
            ticker.tick().await;

            let active = self.active_connections();
            if active == 0 {
                info!(service = %self.service.name, "Server drained");
                return Ok(());
            }
            if Instant::now() >= give_up_at {
                return Err(RelayError::ShutdownTimeout {
                    service: self.service.name.clone(),
                    active,
                });
            }
            warn!(service = %self.service.name, active, "Waiting on connections to drain");
        }
    }
}
