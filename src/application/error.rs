//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("unknown environment '{name}' (configured: {known})")]
    UnknownEnvironment { name: String, known: String },

    #[error("{step} requires an environment")]
    MissingEnvironment { step: String },

    #[error("template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("package source directory not found: {0}")]
    SourceDirNotFound(PathBuf),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
