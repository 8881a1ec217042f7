//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// snowsql error code for a missing or inaccessible object.
const MISSING_OBJECT_CODE: &str = "002003";

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snowsql failed: {message}")]
    Snowsql {
        message: String,
        exit_code: Option<i32>,
    },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether snowsql reported that an object of the given SQL kind
    /// (e.g. `PROCEDURE`) does not exist.
    ///
    /// Missing databases and schemas share error code 002003, so the object
    /// kind in the message is checked as well.
    pub fn is_missing_object(&self, kind: &str) -> bool {
        match self {
            InfraError::Snowsql { message, .. } => {
                let message = message.to_lowercase();
                message.contains(MISSING_OBJECT_CODE)
                    && message.contains(&format!("{} '", kind.to_lowercase()))
                    && message.contains("does not exist")
            }
            _ => false,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
