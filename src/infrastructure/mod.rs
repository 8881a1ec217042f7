//! Infrastructure layer: real I/O and service wiring
//!
//! Filesystem and process implementations of the boundary traits, plus the
//! container that assembles services for a run.

pub mod di;
pub mod error;
pub mod traits;

pub use error::{InfraError, InfraResult};
