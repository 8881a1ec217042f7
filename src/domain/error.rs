//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent business logic violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("provide either a procedure signature or a name with input parameters")]
    MissingIdentity,

    #[error("invalid input parameters '{input}': {message}")]
    InvalidInputParameters { input: String, message: String },

    #[error("unexpected describe output: {message}")]
    InvalidDescribeOutput { message: String },
}
