//! The TCP relay engine.
//!
//! This module provides:
//! - Backend connectors (socket dial, subprocess stdio)
//! - Per-connection state with deadline-bounded, size-capped I/O
//! - The bidirectional relay handler with per-direction pipelines
//! - The per-service server: accept loop, connection registry, graceful
//!   shutdown
//!
//! ## Architecture
//!
//! ```text
//! Client -> ServiceServer -> Connector -> Connection -> relay handler
//!                                                            |
//!                                   source pipeline (client -> backend)
//!                              destination pipeline (backend -> client)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use weir_relay::proxy::{RelayLimits, ServiceServer};
//!
//! let server = Arc::new(ServiceServer::bind(service, RelayLimits::default()).await?);
//! tokio::spawn(Arc::clone(&server).serve());
//! // ...
//! server.shutdown(Duration::from_secs(20)).await?;
//! ```

mod connection;
mod connector;
mod relay;
mod server;

pub use connection::{Connection, RelayLimits};
pub use connector::{
    BackendIo, BackendStream, CommandConnector, CommandStream, Connector, SocketConnector,
    DEFAULT_CONNECT_TIMEOUT,
};
pub use relay::{Direction, RelayOutcome};
pub use server::{RelayStats, ServiceServer};
