//! Regex-based chunk dropper.

use bytes::Bytes;
use regex::bytes::Regex;
use tracing::{debug, info};

use super::require_str;
use crate::{PipelineError, Processor, ProcessorConfig, ResourceContext};

const NAME: &str = "drop-regex";

/// Drops chunks matching a configured regex.
///
/// Config key `regex` holds the pattern, compiled once at initialization.
/// A matching chunk is replaced with an empty buffer; anything else passes
/// through unchanged. An instance that was never initialized passes all
/// traffic through.
#[derive(Debug, Default)]
pub struct DropRegex {
    pattern: Option<Regex>,
}

impl Processor for DropRegex {
    fn initialize(
        &mut self,
        config: &ProcessorConfig,
        _ctx: &ResourceContext,
    ) -> Result<(), PipelineError> {
        let raw = require_str(config, NAME, "regex")?;
        let pattern = Regex::new(raw).map_err(|e| PipelineError::InvalidConfig {
            processor: NAME,
            key: "regex",
            reason: e.to_string(),
        })?;

        info!(regex = %pattern, "Compiled drop pattern");
        self.pattern = Some(pattern);
        Ok(())
    }

    fn process(&self, data: Bytes) -> Bytes {
        match &self.pattern {
            Some(pattern) if pattern.is_match(&data) => {
                debug!(len = data.len(), "Dropping matching chunk");
                Bytes::new()
            }
            _ => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn built(regex: &str) -> DropRegex {
        let mut processor = DropRegex::default();
        let mut config = ProcessorConfig::new();
        config.insert("regex".to_string(), serde_json::json!(regex));
        processor
            .initialize(&config, &ResourceContext::new("."))
            .unwrap();
        processor
    }

    #[rstest]
    #[case(b"GET /admin HTTP/1.0".as_slice(), true)]
    #[case(b"GET /index HTTP/1.0".as_slice(), false)]
    #[case(b"".as_slice(), false)]
    fn drops_only_matching_chunks(#[case] input: &[u8], #[case] dropped: bool) {
        let processor = built("/admin");
        let out = processor.process(Bytes::copy_from_slice(input));
        if dropped {
            assert!(out.is_empty());
        } else {
            assert_eq!(&out[..], input);
        }
    }

    #[test]
    fn missing_regex_key_fails_initialization() {
        let mut processor = DropRegex::default();
        let result = processor.initialize(&ProcessorConfig::new(), &ResourceContext::new("."));
        assert!(matches!(
            result.unwrap_err(),
            PipelineError::MissingConfig { key: "regex", .. }
        ));
    }

    #[test]
    fn invalid_regex_fails_initialization() {
        let mut processor = DropRegex::default();
        let mut config = ProcessorConfig::new();
        config.insert("regex".to_string(), serde_json::json!("(unclosed"));
        let result = processor.initialize(&config, &ResourceContext::new("."));
        assert!(matches!(
            result.unwrap_err(),
            PipelineError::InvalidConfig { key: "regex", .. }
        ));
    }

    #[test]
    fn uninitialized_instance_passes_through() {
        let processor = DropRegex::default();
        assert_eq!(&processor.process("anything".into())[..], b"anything");
    }
}
