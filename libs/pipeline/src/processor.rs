//! The processor contract.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::PipelineError;

/// Configuration map handed to a processor at initialization.
///
/// Keys come from the service configuration file; values are JSON values
/// so processors stay independent of the host's config syntax.
pub type ProcessorConfig = serde_json::Map<String, serde_json::Value>;

/// Load-time context handed to processors alongside their configuration.
///
/// Carries the resources directory so processors can resolve relative
/// file references (pattern dictionaries) without ambient global state.
#[derive(Debug, Clone)]
pub struct ResourceContext {
    resources_dir: PathBuf,
}

impl ResourceContext {
    /// Creates a context rooted at the given resources directory.
    pub fn new(resources_dir: impl Into<PathBuf>) -> Self {
        Self {
            resources_dir: resources_dir.into(),
        }
    }

    /// The resources directory itself.
    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    /// Resolves a relative path against the resources directory.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.resources_dir.join(relative)
    }
}

/// A single stream-transformation unit.
///
/// `initialize` runs once at load time, before the instance is shared;
/// failures there abort the service being configured. `process` is called
/// for every relayed chunk and is infallible by contract: a processor that
/// hits an internal problem must itself pick a pass-through or
/// empty-result policy, because the pipeline has no error channel at
/// call time.
///
/// One instance is shared read-only by every connection of a service, so
/// `process` takes `&self` and any interior state must be safe for
/// concurrent calls. State may persist across calls (a compiled pattern, a
/// built automaton), but no partial-match state carries from one `process`
/// call to the next; each call sees only its argument buffer.
pub trait Processor: Send + Sync {
    /// Validates configuration and builds internal state.
    fn initialize(
        &mut self,
        config: &ProcessorConfig,
        ctx: &ResourceContext,
    ) -> Result<(), PipelineError>;

    /// Transforms one chunk.
    fn process(&self, data: Bytes) -> Bytes;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_against_resources_dir() {
        let ctx = ResourceContext::new("/srv/weir");
        assert_eq!(
            ctx.resolve("words.txt"),
            PathBuf::from("/srv/weir/words.txt")
        );
    }
}
