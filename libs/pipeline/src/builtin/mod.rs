//! Built-in processors.
//!
//! - [`Shout`]: uppercases every chunk.
//! - [`DropRegex`]: drops chunks matching a configured regex.
//! - [`ContentFilter`]: drops chunks containing any pattern from a
//!   dictionary file, backed by the weir-matcher automaton.
//!
//! All three follow the same policy for unwanted traffic: the chunk is
//! replaced with an empty buffer rather than terminating the connection.

mod content_filter;
mod drop_regex;
mod shout;

pub use content_filter::ContentFilter;
pub use drop_regex::DropRegex;
pub use shout::Shout;

use crate::{PipelineError, ProcessorConfig};

/// Fetches a required string key from a processor config map.
fn require_str<'a>(
    config: &'a ProcessorConfig,
    processor: &'static str,
    key: &'static str,
) -> Result<&'a str, PipelineError> {
    match config.get(key) {
        None => Err(PipelineError::MissingConfig { processor, key }),
        Some(value) => value.as_str().ok_or_else(|| PipelineError::InvalidConfig {
            processor,
            key,
            reason: format!("expected a string, got {value}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_str_reports_missing_and_mistyped_keys() {
        let mut config = ProcessorConfig::new();
        assert!(matches!(
            require_str(&config, "p", "key").unwrap_err(),
            PipelineError::MissingConfig { key: "key", .. }
        ));

        config.insert("key".to_string(), serde_json::json!(42));
        assert!(matches!(
            require_str(&config, "p", "key").unwrap_err(),
            PipelineError::InvalidConfig { key: "key", .. }
        ));

        config.insert("key".to_string(), serde_json::json!("value"));
        assert_eq!(require_str(&config, "p", "key").unwrap(), "value");
    }
}
