//! Project packaging service
//!
//! Zips the configured source directory into the deployment artifact.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::infrastructure::traits::FileSystem;

/// Directories never packaged.
const SKIPPED_DIRS: &[&str] = &["__pycache__", ".git"];

/// Packages a project into its artifact.
pub struct PackageService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
    project_dir: PathBuf,
}

impl PackageService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>, project_dir: PathBuf) -> Self {
        Self {
            fs,
            settings,
            project_dir,
        }
    }

    /// Absolute path of the artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.project_dir.join(&self.settings.package.artifact)
    }

    /// Absolute path of the packaged source directory.
    pub fn source_dir(&self) -> PathBuf {
        self.project_dir.join(&self.settings.package.source_dir)
    }

    /// Zip the source directory into the artifact.
    ///
    /// Entry names are relative to the source directory, so a handler
    /// `app.hello` resolves to `app.py` at the archive root. The artifact
    /// itself and cache directories are skipped.
    ///
    /// # Returns
    /// Path of the written artifact
    pub fn package(&self) -> ApplicationResult<PathBuf> {
        let source = self.source_dir();
        let artifact = self.artifact_path();
        debug!(
            "package: source={}, artifact={}",
            source.display(),
            artifact.display()
        );

        if !self.fs.is_dir(&source) {
            return Err(ApplicationError::SourceDirNotFound(source));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut entries = 0usize;

        let walker = WalkDir::new(&source)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir()
                    && SKIPPED_DIRS.iter().any(|d| e.file_name() == *d))
            });

        for entry in walker {
            let entry = entry.map_err(|e| ApplicationError::OperationFailed {
                context: format!("walk {}", source.display()),
                source: Box::new(e),
            })?;
            let path = entry.path();
            if path == artifact {
                continue;
            }
            let Some(name) = archive_name(&source, path) else {
                continue;
            };

            if entry.file_type().is_dir() {
                writer
                    .add_directory(name, options)
                    .map_err(|e| zip_err(&artifact, e))?;
            } else {
                let data = self.fs.read(path).with_path_context("read", path)?;
                writer
                    .start_file(name, options)
                    .map_err(|e| zip_err(&artifact, e))?;
                writer
                    .write_all(&data)
                    .with_path_context("write archive entry", path)?;
                entries += 1;
            }
        }

        let bytes = writer
            .finish()
            .map_err(|e| zip_err(&artifact, e))?
            .into_inner();

        self.fs
            .ensure_parent(&artifact)
            .with_path_context("create artifact directory", &artifact)?;
        self.fs
            .write_bytes(&artifact, &bytes)
            .with_path_context("write artifact", &artifact)?;

        info!("packaged {} files into {}", entries, artifact.display());
        Ok(artifact)
    }
}

/// Archive entry name: path relative to `root`, `/`-separated.
///
/// None for the root itself.
fn archive_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn zip_err(artifact: &Path, e: zip::result::ZipError) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: format!("build archive {}", artifact.display()),
        source: Box::new(e),
    }
}
