pub mod config;
pub mod error;
pub mod proxy;
pub mod service;

pub use config::RelayConfig;
pub use error::RelayError;
pub use proxy::{
    BackendStream, CommandConnector, Connection, Connector, RelayLimits, RelayStats,
    ServiceServer, SocketConnector,
};
pub use service::Service;
