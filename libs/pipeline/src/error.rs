//! Error types for processor loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading and initializing processors.
///
/// All of these are load-time errors and are fatal for the service being
/// configured; `process` itself has no error channel.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No factory registered under the requested name.
    #[error("unknown processor '{0}'")]
    UnknownProcessor(String),

    /// A required configuration key is absent.
    #[error("processor '{processor}' is missing required config key '{key}'")]
    MissingConfig {
        processor: &'static str,
        key: &'static str,
    },

    /// A configuration key is present but unusable.
    #[error("processor '{processor}' config key '{key}' is invalid: {reason}")]
    InvalidConfig {
        processor: &'static str,
        key: &'static str,
        reason: String,
    },

    /// A pattern dictionary could not be read.
    #[error("failed to read dictionary {path}: {source}")]
    Dictionary {
        path: PathBuf,
        source: std::io::Error,
    },
}
