//! Project template service
//!
//! Writes the default procedure template into a project directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_embed::Embed;
use tracing::debug;
use walkdir::WalkDir;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::infrastructure::traits::FileSystem;

/// Default procedure template compiled into the binary.
#[derive(Embed)]
#[folder = "templates/default_procedure/"]
struct DefaultProcedure;

/// Where `init` takes its files from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Template embedded in the binary
    Bundled,
    /// A template directory on disk
    Directory(PathBuf),
}

impl TemplateSource {
    /// Configured template directory, or the bundled template.
    pub fn from_settings(settings: &Settings) -> Self {
        match &settings.template_dir {
            Some(dir) => TemplateSource::Directory(dir.clone()),
            None => TemplateSource::Bundled,
        }
    }
}

/// Template bootstrap service.
pub struct TemplateService {
    fs: Arc<dyn FileSystem>,
}

impl TemplateService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Relative paths of the bundled template files, sorted.
    pub fn bundled_files() -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = DefaultProcedure::iter()
            .map(|name| PathBuf::from(name.as_ref()))
            .collect();
        files.sort();
        files
    }

    /// Copy the template into `dest`, overwriting files at conflicting paths.
    ///
    /// # Returns
    /// Relative paths of the files written
    pub fn init(&self, source: &TemplateSource, dest: &Path) -> ApplicationResult<Vec<PathBuf>> {
        debug!("init: source={:?}, dest={}", source, dest.display());
        self.fs
            .create_dir_all(dest)
            .with_path_context("create directory", dest)?;

        match source {
            TemplateSource::Bundled => self.write_bundled(dest),
            TemplateSource::Directory(dir) => self.copy_directory(dir, dest),
        }
    }

    fn write_bundled(&self, dest: &Path) -> ApplicationResult<Vec<PathBuf>> {
        let files = Self::bundled_files();
        if files.is_empty() {
            return Err(ApplicationError::TemplateNotFound(PathBuf::from(
                "default_procedure",
            )));
        }

        for relative in &files {
            let name = relative.to_string_lossy();
            let file = DefaultProcedure::get(&name)
                .ok_or_else(|| ApplicationError::TemplateNotFound(relative.clone()))?;
            let target = dest.join(relative);
            self.fs
                .ensure_parent(&target)
                .with_path_context("create directory", &target)?;
            self.fs
                .write_bytes(&target, &file.data)
                .with_path_context("write template file", &target)?;
            debug!("init: wrote {}", target.display());
        }
        Ok(files)
    }

    fn copy_directory(&self, dir: &Path, dest: &Path) -> ApplicationResult<Vec<PathBuf>> {
        if !self.fs.is_dir(dir) {
            return Err(ApplicationError::TemplateNotFound(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ApplicationError::OperationFailed {
                context: format!("walk template {}", dir.display()),
                source: Box::new(e),
            })?;
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            let target = dest.join(relative);

            if entry.file_type().is_dir() {
                self.fs
                    .create_dir_all(&target)
                    .with_path_context("create directory", &target)?;
            } else {
                self.fs
                    .ensure_parent(&target)
                    .with_path_context("create directory", &target)?;
                self.fs
                    .copy(entry.path(), &target)
                    .with_path_context("copy template file", entry.path())?;
                files.push(relative.to_path_buf());
            }
        }
        Ok(files)
    }
}
