//! # weir-id
//!
//! Typed identifiers for the weir relay.
//!
//! Relayed connections and loaded services get system-generated IDs that
//! show up in logs and in the per-server connection registry. IDs are
//! typed so a connection ID cannot be mistaken for a service ID, and every
//! ID has a canonical string form with strict parsing.
//!
//! ## ID format
//!
//! All IDs use a prefixed format: `{prefix}_{ulid}`
//!
//! Examples:
//! - `conn_01HV4Z2WQXKJNM8GPQY6VBKC3D`
//! - `svc_01HV4Z3MXNKPQR9HSTZ7WCLD4E`
//!
//! ULIDs are time-ordered, so sorting connection IDs sorts by accept time.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
