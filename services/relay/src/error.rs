//! Relay service errors.

use thiserror::Error;

/// Errors that terminate a server or the whole process.
///
/// Per-connection failures never surface here: they are logged with the
/// connection's identity and the connection is torn down in isolation.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Graceful drain did not complete before the deadline.
    #[error("shutdown of service '{service}' timed out with {active} connections still active")]
    ShutdownTimeout { service: String, active: usize },
}
