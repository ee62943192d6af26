//! Service definitions.
//!
//! A service is the immutable description of one relay: where to listen,
//! how to reach the backend, and which pipelines to apply in each
//! direction. Services are built from configuration at startup and shared
//! read-only by every connection.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use weir_id::ServiceId;
use weir_pipeline::{Pipeline, Registry, ResourceContext};

use crate::config::{PluginSpec, ServiceKind, ServiceSpec};
use crate::proxy::{CommandConnector, Connector, SocketConnector};

/// One loaded relay service.
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    /// Address the server listens on, as `host:port`.
    pub listen_addr: String,
    /// Produces the backend stream for each accepted connection.
    pub connector: Arc<dyn Connector>,
    /// Applied to client-to-backend traffic.
    pub src_pipeline: Pipeline,
    /// Applied to backend-to-client traffic.
    pub dst_pipeline: Pipeline,
}

impl Service {
    /// Builds a service from its configuration entry.
    ///
    /// Fails on a missing backend address/command or on any processor that
    /// cannot be loaded; configuration failures abort startup rather than
    /// producing a partially-configured service.
    pub fn from_spec(
        name: &str,
        spec: &ServiceSpec,
        registry: &Registry,
        ctx: &ResourceContext,
    ) -> Result<Self> {
        let connector: Arc<dyn Connector> = match spec.kind {
            ServiceKind::Socket => {
                let port = spec
                    .destination
                    .port
                    .context("socket service requires a destination port")?;
                Arc::new(SocketConnector::new(&spec.destination.host, port))
            }
            ServiceKind::Command => {
                let command = spec
                    .destination
                    .command
                    .clone()
                    .context("command service requires a destination command")?;
                Arc::new(CommandConnector::new(command))
            }
        };

        let src_pipeline = build_pipeline(&spec.source.plugins, registry, ctx)
            .context("failed to load source plugins")?;
        let dst_pipeline = build_pipeline(&spec.destination.plugins, registry, ctx)
            .context("failed to load destination plugins")?;

        info!(
            service = name,
            source_plugins = src_pipeline.len(),
            destination_plugins = dst_pipeline.len(),
            "Loaded service"
        );

        Ok(Self {
            id: ServiceId::new(),
            name: name.to_string(),
            listen_addr: spec.source.listen_addr(),
            connector,
            src_pipeline,
            dst_pipeline,
        })
    }
}

fn build_pipeline(
    specs: &[PluginSpec],
    registry: &Registry,
    ctx: &ResourceContext,
) -> Result<Pipeline> {
    let mut stages = Vec::with_capacity(specs.len());
    for spec in specs {
        let config = spec.processor_config()?;
        let processor = registry
            .build(&spec.name, &config, ctx)
            .with_context(|| format!("failed to initialize processor '{}'", spec.name))?;
        stages.push((spec.name.clone(), processor));
    }
    Ok(Pipeline::new(stages))
}
