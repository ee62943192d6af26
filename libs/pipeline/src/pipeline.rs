//! Ordered application of processors.

use std::sync::Arc;

use bytes::Bytes;

use crate::Processor;

/// One configured stage of a pipeline.
#[derive(Clone)]
struct Stage {
    name: String,
    processor: Arc<dyn Processor>,
}

/// A fixed, ordered list of processors applied to one direction of a
/// connection's traffic.
///
/// Applying the pipeline feeds the buffer through the first stage, then
/// the second stage with the first stage's output, and so on. Pipelines
/// are immutable once built and shared by every connection of a service.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Builds a pipeline from named, already-initialized processors.
    pub fn new(stages: Vec<(String, Arc<dyn Processor>)>) -> Self {
        Self {
            stages: stages
                .into_iter()
                .map(|(name, processor)| Stage { name, processor })
                .collect(),
        }
    }

    /// An empty pipeline that returns every chunk unchanged.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True if the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names, in application order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Runs one chunk through every stage in order.
    pub fn apply(&self, data: Bytes) -> Bytes {
        self.stages
            .iter()
            .fold(data, |buf, stage| stage.processor.process(buf))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{PipelineError, ProcessorConfig, ResourceContext};

    /// Appends a fixed byte to every chunk.
    struct Append(u8);

    impl Processor for Append {
        fn initialize(
            &mut self,
            _config: &ProcessorConfig,
            _ctx: &ResourceContext,
        ) -> Result<(), PipelineError> {
            Ok(())
        }

        fn process(&self, data: Bytes) -> Bytes {
            let mut out = data.to_vec();
            out.push(self.0);
            Bytes::from(out)
        }
    }

    #[test]
    fn stages_apply_in_configured_order() {
        let pipeline = Pipeline::new(vec![
            ("append-a".to_string(), Arc::new(Append(b'a')) as _),
            ("append-b".to_string(), Arc::new(Append(b'b')) as _),
        ]);

        // Second stage sees the first stage's output.
        assert_eq!(&pipeline.apply("x".into())[..], b"xab");
    }

    #[test]
    fn chunks_are_independent() {
        let pipeline = Pipeline::new(vec![(
            "append-a".to_string(),
            Arc::new(Append(b'a')) as _,
        )]);

        assert_eq!(&pipeline.apply("one".into())[..], b"onea");
        assert_eq!(&pipeline.apply("two".into())[..], b"twoa");
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let pipeline = Pipeline::empty();
        assert!(pipeline.is_empty());
        assert_eq!(&pipeline.apply("payload".into())[..], b"payload");
    }
}
