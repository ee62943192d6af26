//! # weir-pipeline
//!
//! The stream-transformation layer of the weir relay.
//!
//! A [`Processor`] is a named, configured transformation unit: it is
//! initialized once at load time (fallibly) and then applied to byte
//! chunks (infallibly) for the life of the service. A [`Pipeline`] is an
//! ordered list of processors applied in sequence to one direction of a
//! relayed connection.
//!
//! Processors are discovered by name through the [`Registry`], which maps
//! processor names to factories. The built-in processors live in
//! [`builtin`]; hosts can register additional factories before loading
//! services.
//!
//! ```
//! use weir_pipeline::{ProcessorConfig, Registry, ResourceContext};
//!
//! let registry = Registry::with_builtins();
//! let ctx = ResourceContext::new("./resources");
//! let shout = registry
//!     .build("shout", &ProcessorConfig::new(), &ctx)
//!     .unwrap();
//! assert_eq!(&shout.process("hi".into())[..], b"HI");
//! ```

pub mod builtin;
mod error;
mod pipeline;
mod processor;
mod registry;

pub use error::PipelineError;
pub use pipeline::Pipeline;
pub use processor::{Processor, ProcessorConfig, ResourceContext};
pub use registry::Registry;
