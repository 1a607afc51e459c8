//! patentyx-common — Shared errors, HTTP sandbox and query configuration used across Patentyx crates.

pub mod error;
pub mod query_config;
pub mod sandbox;

// Re-export commonly used types
pub use error::{PatentyxError, Result};
pub use query_config::{QueryConfig, QueryDefaults, QueryOverride};
