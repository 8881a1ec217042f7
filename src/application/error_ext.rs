//! Error conversion helpers for I/O and process calls
//!
//! Turns `io::Result` into `ApplicationResult` with a short description of
//! what was being attempted.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// ```ignore
    /// fs.write_bytes(&target, &data)
    ///     .with_path_context("write template file", &target)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;

    /// Add free-form context, built only on error.
    fn with_context<F>(self, context: F) -> ApplicationResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.with_context(|| format!("{}: {}", action, path.display()))
    }

    fn with_context<F>(self, context: F) -> ApplicationResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: context(),
            source: Box::new(e),
        })
    }
}
