// Public modules
pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod github;
pub mod release;
pub mod trigger;

// Internal modules - not part of public API
pub(crate) mod git;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
