//! Relay configuration.
//!
//! Configuration lives in `relay.toml` inside the resources directory.
//! Runtime parameters (idle timeout, read cap, verbosity) have defaults
//! and `WEIR_*` environment overrides; services are declared as named
//! tables with a source listener and either a socket or a command backend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use weir_pipeline::ProcessorConfig;

use crate::proxy::RelayLimits;

/// Config file name inside the resources directory.
pub const CONFIG_FILE: &str = "relay.toml";

fn default_true() -> bool {
    true
}

fn default_idle_timeout_ms() -> u64 {
    10_000
}

fn default_max_read_bytes() -> usize {
    64 * 1024
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_backend_host() -> String {
    "127.0.0.1".to_string()
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Debug-level logging when true.
    #[serde(default = "default_true")]
    pub log_everything: bool,

    /// Sliding inactivity window per connection, in milliseconds.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Upper bound on bytes returned by a single read.
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,

    /// Service definitions by name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceSpec>,

    /// Directory the config was loaded from; dictionaries and other
    /// resources resolve against it.
    #[serde(skip)]
    pub resources_dir: PathBuf,
}

impl RelayConfig {
    /// Loads `relay.toml` from the resources directory and applies
    /// environment overrides.
    pub fn load(resources_dir: &Path) -> Result<Self> {
        let path = resources_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;
        config.resources_dir = resources_dir.to_path_buf();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid relay TOML")
    }

    /// The idle timeout as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// The per-connection limits derived from this configuration.
    pub fn limits(&self) -> RelayLimits {
        RelayLimits {
            idle_timeout: self.idle_timeout(),
            max_read_bytes: self.max_read_bytes,
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("WEIR_IDLE_TIMEOUT_MS") {
            self.idle_timeout_ms = value
                .parse()
                .context("WEIR_IDLE_TIMEOUT_MS must be an integer (milliseconds)")?;
        }
        if let Ok(value) = std::env::var("WEIR_MAX_READ_BYTES") {
            self.max_read_bytes = value
                .parse()
                .context("WEIR_MAX_READ_BYTES must be an integer")?;
        }
        if let Ok(value) = std::env::var("WEIR_LOG_EVERYTHING") {
            self.log_everything = value == "1" || value.eq_ignore_ascii_case("true");
        }
        Ok(())
    }
}

/// Backend flavor of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Dial a TCP address.
    Socket,
    /// Spawn a subprocess and relay through its stdio.
    Command,
}

/// One service definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSpec {
    #[serde(rename = "type")]
    pub kind: ServiceKind,
    pub source: SourceSpec,
    pub destination: DestinationSpec,
}

/// Listener side of a service.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    #[serde(default = "default_listen_host")]
    pub host: String,
    pub port: u16,
    /// Pipeline applied to client-to-backend traffic, in order.
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
}

impl SourceSpec {
    /// The address to listen on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Backend side of a service.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationSpec {
    #[serde(default = "default_backend_host")]
    pub host: String,
    /// Required for `type = "socket"`.
    pub port: Option<u16>,
    /// Required for `type = "command"`.
    pub command: Option<String>,
    /// Pipeline applied to backend-to-client traffic, in order.
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
}

/// One named, configured pipeline stage.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    /// Everything except `name` is handed to the processor as-is.
    #[serde(flatten)]
    pub config: toml::Table,
}

impl PluginSpec {
    /// The processor's config as the pipeline layer's JSON-value map.
    pub fn processor_config(&self) -> Result<ProcessorConfig> {
        let value = serde_json::to_value(&self.config)
            .with_context(|| format!("invalid config for processor '{}'", self.name))?;
        match value {
            serde_json::Value::Object(map) => Ok(map),
            other => anyhow::bail!(
                "config for processor '{}' must be a table, got {other}",
                self.name
            ),
        }
    }
}
