//! weir relayd
//!
//! Configurable TCP relay. Each configured service listens on its own
//! address, opens a backend per accepted connection (socket dial or
//! spawned subprocess), and copies bytes both ways through ordered
//! per-direction processor pipelines. Idle connections are reclaimed by a
//! sliding inactivity window; SIGINT triggers a graceful drain.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weir_pipeline::{Registry, ResourceContext};
use weir_relay::config::RelayConfig;
use weir_relay::proxy::ServiceServer;
use weir_relay::service::Service;

/// Drain deadline, as a multiple of the idle timeout.
const SHUTDOWN_DEADLINE_FACTOR: u32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "relayd",
    about = "Configurable TCP relay with pluggable stream transformations"
)]
struct Args {
    /// Directory with the relay config and plugin resources.
    #[arg(long, default_value = "./resources")]
    resources: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = RelayConfig::load(&args.resources)?;

    // Initialize tracing (RUST_LOG wins over the config verbosity).
    let default_level = if config.log_everything { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting weir relay");
    info!(
        resources = %args.resources.display(),
        idle_timeout_ms = config.idle_timeout_ms,
        max_read_bytes = config.max_read_bytes,
        service_count = config.services.len(),
        "Configuration loaded"
    );

    let registry = Registry::with_builtins();
    let ctx = ResourceContext::new(&config.resources_dir);
    let limits = config.limits();

    let mut servers = Vec::with_capacity(config.services.len());
    for (name, spec) in &config.services {
        let service = Service::from_spec(name, spec, &registry, &ctx)
            .with_context(|| format!("failed to load service '{name}'"))?;

        let server = ServiceServer::bind(Arc::new(service), limits)
            .await
            .with_context(|| format!("failed to bind service '{name}'"))?;
        let server = Arc::new(server);

        tokio::spawn({
            let server = Arc::clone(&server);
            async move {
                if let Err(e) = server.serve().await {
                    error!(error = %e, "Server error");
                }
            }
        });
        servers.push(server);
    }
    info!(count = servers.len(), "Successfully loaded services");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutting down servers");
    let drain_deadline = config.idle_timeout() * SHUTDOWN_DEADLINE_FACTOR;
    for server in &servers {
        server
            .shutdown(drain_deadline)
            .await
            .context("graceful shutdown failed")?;
    }

    info!("Shutdown complete");
    Ok(())
}
