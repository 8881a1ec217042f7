//! Contract of the snowpark helper layer.
//!
//! The dispatcher only ever talks to this trait. `SnowparkService` is the
//! real implementation; tests substitute recording doubles.

use std::path::PathBuf;

use crate::application::ApplicationResult;
use crate::config::EnvironmentConfig;
use crate::domain::{Deployment, ObjectKind, ProcedureSelector, ProcedureSpec};

/// Packaging and remote operations on warehouse objects.
pub trait SnowparkOps: Send + Sync {
    /// Package the current project into its artifact; returns the artifact path.
    fn package(&self) -> ApplicationResult<PathBuf>;

    /// Upload the artifact and create the object.
    ///
    /// `overwrite` replaces an existing object instead of failing.
    fn create(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        spec: &ProcedureSpec,
        overwrite: bool,
    ) -> ApplicationResult<Deployment>;

    /// Upload the artifact and update the object.
    ///
    /// `replace` forces recreation even when no metadata change is detected.
    fn update(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        spec: &ProcedureSpec,
        replace: bool,
    ) -> ApplicationResult<Deployment>;

    /// Call the object with concrete arguments, e.g. `hello(1, 'x')`.
    fn execute(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        select: &str,
    ) -> ApplicationResult<String>;

    fn describe(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        selector: &ProcedureSelector,
    ) -> ApplicationResult<String>;

    /// List objects whose name matches a SQL `LIKE` pattern.
    fn list(&self, kind: ObjectKind, env: &EnvironmentConfig, like: &str)
        -> ApplicationResult<String>;

    /// Drop the object identified by the selector.
    fn drop_object(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        selector: &ProcedureSelector,
    ) -> ApplicationResult<String>;
}
