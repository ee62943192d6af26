//! Uppercasing processor.

use bytes::Bytes;
use tracing::trace;

use crate::{PipelineError, Processor, ProcessorConfig, ResourceContext};

/// Uppercases every chunk (ASCII only; other bytes pass through).
#[derive(Debug, Default)]
pub struct Shout;

impl Processor for Shout {
    fn initialize(
        &mut self,
        _config: &ProcessorConfig,
        _ctx: &ResourceContext,
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    fn process(&self, data: Bytes) -> Bytes {
        trace!(len = data.len(), "Shouting chunk");
        Bytes::from(data.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_ascii() {
        let shout = Shout;
        assert_eq!(&shout.process("hello, Relay!".into())[..], b"HELLO, RELAY!");
    }

    #[test]
    fn leaves_non_ascii_bytes_alone() {
        let shout = Shout;
        let input = Bytes::from(vec![0x01, 0xff, b'a']);
        assert_eq!(&shout.process(input)[..], &[0x01, 0xff, b'A']);
    }
}
