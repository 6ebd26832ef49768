//! Generic pipeline execution infrastructure.
//!
//! - `pipeline` - Step traits, topological ordering, sequential execution
//!
//! Domain-specific orchestration (the release publish flow) builds on these
//! primitives.

pub mod pipeline;
