//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::services::{SnowparkService, TemplateService, TemplateSource};
use crate::application::{Dispatcher, SnowparkOps};
use crate::config::Settings;
use crate::domain::ObjectKind;
use crate::infrastructure::traits::{CommandRunner, FileSystem, RealCommandRunner, RealFileSystem};
use crate::infrastructure::InfraResult;

/// Container holding all application services for one run.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Directory commands operate in (cwd for real runs)
    pub project_dir: PathBuf,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    /// Helper layer used by the dispatcher
    pub snowpark: Arc<dyn SnowparkOps>,
}

impl ServiceContainer {
    /// Load settings for `project_dir` and wire real implementations.
    pub fn load(project_dir: &Path) -> InfraResult<Self> {
        let settings = Settings::load(Some(project_dir))?;
        Ok(Self::new(settings, project_dir.to_path_buf()))
    }

    /// Create a new service container with real implementations.
    pub fn new(settings: Settings, project_dir: PathBuf) -> Self {
        Self::with_deps(
            settings,
            project_dir,
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        project_dir: PathBuf,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
    ) -> Self {
        let settings = Arc::new(settings);
        let snowpark: Arc<dyn SnowparkOps> = Arc::new(SnowparkService::new(
            fs.clone(),
            cmd.clone(),
            settings.clone(),
            project_dir.clone(),
        ));

        Self {
            settings,
            project_dir,
            fs,
            cmd,
            snowpark,
        }
    }

    /// Replace the helper layer (for testing).
    pub fn with_snowpark(mut self, snowpark: Arc<dyn SnowparkOps>) -> Self {
        self.snowpark = snowpark;
        self
    }

    /// Dispatcher for procedure commands.
    pub fn procedure_dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            ObjectKind::Procedure,
            self.snowpark.clone(),
            TemplateService::new(self.fs.clone()),
            TemplateSource::from_settings(&self.settings),
            self.project_dir.clone(),
        )
    }
}
