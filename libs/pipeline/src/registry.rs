//! Name-to-factory processor registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::builtin::{ContentFilter, DropRegex, Shout};
use crate::{PipelineError, Processor, ProcessorConfig, ResourceContext};

/// Factory producing a blank processor instance.
pub type ProcessorFactory = fn() -> Box<dyn Processor>;

/// Maps processor names to factories.
///
/// Services name their processors in configuration; the registry turns a
/// name plus a config map into an initialized, shareable instance. The
/// built-ins are registered at startup; hosts may register more factories
/// before services are loaded.
pub struct Registry {
    factories: HashMap<&'static str, ProcessorFactory>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with every built-in processor registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("shout", || Box::new(Shout::default()));
        registry.register("drop-regex", || Box::new(DropRegex::default()));
        registry.register("content-filter", || Box::new(ContentFilter::default()));
        registry
    }

    /// Registers a factory under a name, replacing any previous entry.
    pub fn register(&mut self, name: &'static str, factory: ProcessorFactory) {
        self.factories.insert(name, factory);
    }

    /// Names of all registered processors.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Instantiates and initializes the named processor.
    pub fn build(
        &self,
        name: &str,
        config: &ProcessorConfig,
        ctx: &ResourceContext,
    ) -> Result<Arc<dyn Processor>, PipelineError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PipelineError::UnknownProcessor(name.to_string()))?;

        let mut processor = factory();
        processor.initialize(config, ctx)?;
        debug!(processor = name, "Initialized processor");
        Ok(Arc::from(processor))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = Registry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["content-filter", "drop-regex", "shout"]
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        let registry = Registry::with_builtins();
        let result = registry.build(
            "no-such-processor",
            &ProcessorConfig::new(),
            &ResourceContext::new("."),
        );
        let err = result.err().expect("expected an error");
        assert!(matches!(
            err,
            PipelineError::UnknownProcessor(name) if name == "no-such-processor"
        ));
    }

    #[test]
    fn build_initializes_the_instance() {
        let registry = Registry::with_builtins();
        let shout = registry
            .build("shout", &ProcessorConfig::new(), &ResourceContext::new("."))
            .unwrap();
        assert_eq!(&shout.process("ok".into())[..], b"OK");
    }
}
