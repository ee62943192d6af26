//! Dictionary-based content filter.

use std::fs;

use bytes::Bytes;
use tracing::{debug, info};

use weir_matcher::Automaton;

use super::require_str;
use crate::{PipelineError, Processor, ProcessorConfig, ResourceContext};

const NAME: &str = "content-filter";

/// Drops chunks containing any pattern from a dictionary file.
///
/// Config key `dictionary` names a newline-separated pattern file resolved
/// against the resources directory. Matching is multi-pattern substring
/// containment per chunk; a chunk with a hit is replaced with an empty
/// buffer, everything else passes through unchanged.
///
/// Matching restarts for every chunk, so a pattern split across two chunks
/// is not detected.
#[derive(Default)]
pub struct ContentFilter {
    automaton: Option<Automaton>,
}

impl Processor for ContentFilter {
    fn initialize(
        &mut self,
        config: &ProcessorConfig,
        ctx: &ResourceContext,
    ) -> Result<(), PipelineError> {
        let dictionary = require_str(config, NAME, "dictionary")?;
        let path = ctx.resolve(dictionary);

        let contents = fs::read_to_string(&path).map_err(|source| PipelineError::Dictionary {
            path: path.clone(),
            source,
        })?;

        let automaton = Automaton::from_patterns(contents.lines().filter(|l| !l.is_empty()));
        info!(
            path = %path.display(),
            patterns = automaton.pattern_count(),
            "Loaded filter dictionary"
        );

        self.automaton = Some(automaton);
        Ok(())
    }

    fn process(&self, data: Bytes) -> Bytes {
        match &self.automaton {
            Some(automaton) if automaton.contains_match(&data) => {
                debug!(len = data.len(), "Dropping filtered chunk");
                Bytes::new()
            }
            _ => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::TempDir;

    fn built(patterns: &[&str]) -> (ContentFilter, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut file = fs::File::create(dir.path().join("words.txt")).unwrap();
        for pattern in patterns {
            writeln!(file, "{pattern}").unwrap();
        }

        let mut processor = ContentFilter::default();
        let mut config = ProcessorConfig::new();
        config.insert("dictionary".to_string(), serde_json::json!("words.txt"));
        processor
            .initialize(&config, &ResourceContext::new(dir.path()))
            .unwrap();
        (processor, dir)
    }

    #[test]
    fn clean_chunks_pass_through_unchanged() {
        let (processor, _dir) = built(&["virus", "worm"]);
        assert_eq!(
            &processor.process("perfectly ordinary traffic".into())[..],
            b"perfectly ordinary traffic"
        );
    }

    #[test]
    fn matching_chunks_become_empty() {
        let (processor, _dir) = built(&["virus", "worm"]);
        assert!(processor.process("carrying a virus payload".into()).is_empty());
        assert!(processor.process("worm".into()).is_empty());
    }

    #[test]
    fn pattern_split_across_process_calls_slips_through() {
        let (processor, _dir) = built(&["virus"]);
        // Each call matches from scratch, so neither half alone is caught.
        assert_eq!(&processor.process("has a vi".into())[..], b"has a vi");
        assert_eq!(&processor.process("rus in it".into())[..], b"rus in it");
    }

    #[test]
    fn blank_dictionary_lines_are_skipped() {
        let (processor, _dir) = built(&["bad", "", ""]);
        assert_eq!(&processor.process("good".into())[..], b"good");
        assert!(processor.process("badness".into()).is_empty());
    }

    #[test]
    fn missing_dictionary_key_fails_initialization() {
        let mut processor = ContentFilter::default();
        let result = processor.initialize(&ProcessorConfig::new(), &ResourceContext::new("."));
        assert!(matches!(
            result.unwrap_err(),
            PipelineError::MissingConfig { key: "dictionary", .. }
        ));
    }

    #[test]
    fn unreadable_dictionary_fails_initialization() {
        let dir = TempDir::new().unwrap();
        let mut processor = ContentFilter::default();
        let mut config = ProcessorConfig::new();
        config.insert("dictionary".to_string(), serde_json::json!("absent.txt"));
        let result = processor.initialize(&config, &ResourceContext::new(dir.path()));
        assert!(matches!(
            result.unwrap_err(),
            PipelineError::Dictionary { .. }
        ));
    }
}
