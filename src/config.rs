//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/snowproc/snowproc.toml`
//! 3. Project config: `<project_dir>/snowproc.toml`
//! 4. Environment variables: `SNOWPROC__*` prefix, `__` between levels

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::expand_env_vars;

/// Environment used when none is given on the command line.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Connection settings for one deployment target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment name; filled in on resolution
    #[serde(skip)]
    pub name: String,
    /// Named snowsql connection (`[connections.<name>]` in snowsql's config)
    pub connection: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
    pub warehouse: Option<String>,
}

/// Raw environment for intermediate parsing (every field optional).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawEnvironment {
    pub connection: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
    pub warehouse: Option<String>,
}

impl EnvironmentConfig {
    /// Overlay fields that are set; keep the rest.
    pub fn merge(&self, overlay: &RawEnvironment) -> Self {
        Self {
            name: self.name.clone(),
            connection: overlay.connection.clone().or_else(|| self.connection.clone()),
            database: overlay.database.clone().or_else(|| self.database.clone()),
            schema: overlay.schema.clone().or_else(|| self.schema.clone()),
            role: overlay.role.clone().or_else(|| self.role.clone()),
            warehouse: overlay.warehouse.clone().or_else(|| self.warehouse.clone()),
        }
    }
}

/// Packaging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PackageConfig {
    /// Directory whose contents go into the artifact (relative to project)
    pub source_dir: PathBuf,
    /// Artifact written by packaging (relative to project)
    pub artifact: PathBuf,
    /// Requirements file listing extra runtime packages
    pub requirements: PathBuf,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("app"),
            artifact: PathBuf::from("app.zip"),
            requirements: PathBuf::from("requirements.snowflake.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawPackageConfig {
    pub source_dir: Option<PathBuf>,
    pub artifact: Option<PathBuf>,
    pub requirements: Option<PathBuf>,
}

impl PackageConfig {
    fn merge(&self, overlay: &RawPackageConfig) -> Self {
        Self {
            source_dir: overlay
                .source_dir
                .clone()
                .unwrap_or_else(|| self.source_dir.clone()),
            artifact: overlay
                .artifact
                .clone()
                .unwrap_or_else(|| self.artifact.clone()),
            requirements: overlay
                .requirements
                .clone()
                .unwrap_or_else(|| self.requirements.clone()),
        }
    }
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub snowsql_path: Option<String>,
    pub stage: Option<String>,
    pub runtime_version: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub package: RawPackageConfig,
    pub environments: BTreeMap<String, RawEnvironment>,
}

/// Unified configuration for snowproc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// snowsql executable (default: "snowsql" on PATH)
    pub snowsql_path: String,
    /// Stage receiving deployment artifacts
    pub stage: String,
    /// Python runtime version for created procedures
    pub runtime_version: String,
    /// Custom template directory for `init` (default: bundled template)
    pub template_dir: Option<PathBuf>,
    pub package: PackageConfig,
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut environments = BTreeMap::new();
        environments.insert(
            DEFAULT_ENVIRONMENT.to_string(),
            EnvironmentConfig {
                connection: Some(DEFAULT_ENVIRONMENT.to_string()),
                ..Default::default()
            },
        );

        Self {
            snowsql_path: "snowsql".into(),
            stage: "deployments".into(),
            runtime_version: "3.8".into(),
            template_dir: None,
            package: PackageConfig::default(),
            environments,
        }
    }
}

/// Get the XDG config directory for snowproc.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "snowproc").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("snowproc.toml"))
}

/// Get the path to the project config file.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join("snowproc.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.snowsql_path = expand_env_vars(&self.snowsql_path);
        if let Some(dir) = &self.template_dir {
            self.template_dir = Some(PathBuf::from(expand_env_vars(&dir.to_string_lossy())));
        }
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalars: overlay wins if Some, otherwise keep base
    /// - Environments: merged per name, then per field
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut environments = self.environments.clone();
        for (name, raw) in &overlay.environments {
            let merged = environments.get(name).cloned().unwrap_or_default().merge(raw);
            environments.insert(name.clone(), merged);
        }

        Self {
            snowsql_path: overlay
                .snowsql_path
                .clone()
                .unwrap_or_else(|| self.snowsql_path.clone()),
            stage: overlay.stage.clone().unwrap_or_else(|| self.stage.clone()),
            runtime_version: overlay
                .runtime_version
                .clone()
                .unwrap_or_else(|| self.runtime_version.clone()),
            template_dir: overlay
                .template_dir
                .clone()
                .or_else(|| self.template_dir.clone()),
            package: self.package.merge(&overlay.package),
            environments,
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for `snowproc.toml`
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_layers(global_config_path().as_deref(), project_dir)
    }

    /// Load settings from an explicit global config path.
    ///
    /// Missing files are skipped; a file that exists but fails to parse is an error.
    pub fn load_layers(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_path {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Project config
        if let Some(project) = project_dir {
            let local_path = project_config_path(project);
            if local_path.exists() {
                debug!("load: project config {}", local_path.display());
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();

        Ok(current)
    }

    /// Apply SNOWPROC__* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("SNOWPROC")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        let mut raw = RawSettings {
            snowsql_path: config.get_string("snowsql_path").ok(),
            stage: config.get_string("stage").ok(),
            runtime_version: config.get_string("runtime_version").ok(),
            template_dir: config.get_string("template_dir").ok().map(PathBuf::from),
            ..Default::default()
        };
        raw.package = RawPackageConfig {
            source_dir: config.get_string("package.source_dir").ok().map(PathBuf::from),
            artifact: config.get_string("package.artifact").ok().map(PathBuf::from),
            requirements: config
                .get_string("package.requirements")
                .ok()
                .map(PathBuf::from),
        };
        if let Ok(environments) = config.get::<BTreeMap<String, RawEnvironment>>("environments") {
            raw.environments = environments;
        }

        Ok(settings.merge_with(&raw))
    }

    /// Resolve a named environment.
    pub fn environment(&self, name: &str) -> Result<EnvironmentConfig, ApplicationError> {
        self.environments
            .get(name)
            .map(|env| EnvironmentConfig {
                name: name.to_string(),
                ..env.clone()
            })
            .ok_or_else(|| ApplicationError::UnknownEnvironment {
                name: name.to_string(),
                known: self.environments.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# snowproc configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/snowproc/snowproc.toml
#   Project: ./snowproc.toml
#   Env:     SNOWPROC__* environment variables, e.g. SNOWPROC__ENVIRONMENTS__DEV__DATABASE

# snowsql executable
# snowsql_path = "snowsql"

# Stage receiving deployment artifacts
# stage = "deployments"

# Python runtime for created procedures
# runtime_version = "3.8"

# Template used by `snowproc procedure init` (default: bundled template)
# template_dir = "~/templates/procedure"

[package]
# source_dir = "app"
# artifact = "app.zip"
# requirements = "requirements.snowflake.txt"

# One table per environment; select with --environment <name>
[environments.dev]
connection = "dev"
# database = "MY_DB"
# schema = "PUBLIC"
# role = "DEVELOPER"
# warehouse = "COMPUTE_WH"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.snowsql_path, "snowsql");
        assert_eq!(settings.stage, "deployments");
        assert_eq!(settings.package.artifact, PathBuf::from("app.zip"));
        assert!(settings.environments.contains_key(DEFAULT_ENVIRONMENT));
    }

    #[test]
    fn given_overlay_environment_when_merging_then_fields_merge() {
        let base = Settings::default();
        let mut overlay = RawSettings::default();
        overlay.environments.insert(
            "dev".into(),
            RawEnvironment {
                database: Some("DEV_DB".into()),
                ..Default::default()
            },
        );
        overlay.environments.insert(
            "prod".into(),
            RawEnvironment {
                connection: Some("prod".into()),
                ..Default::default()
            },
        );

        let merged = base.merge_with(&overlay);

        let dev = merged.environment("dev").unwrap();
        assert_eq!(dev.connection.as_deref(), Some("dev"));
        assert_eq!(dev.database.as_deref(), Some("DEV_DB"));
        assert_eq!(dev.name, "dev");
        assert_eq!(
            merged.environment("prod").unwrap().connection.as_deref(),
            Some("prod")
        );
    }

    #[test]
    fn given_overlay_scalars_when_merging_then_overlay_wins() {
        let base = Settings::default();
        let overlay = RawSettings {
            stage: Some("artifacts".into()),
            package: RawPackageConfig {
                artifact: Some(PathBuf::from("dist/app.zip")),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.stage, "artifacts");
        assert_eq!(merged.package.artifact, PathBuf::from("dist/app.zip"));
        assert_eq!(merged.package.source_dir, PathBuf::from("app"));
        assert_eq!(merged.runtime_version, "3.8");
    }

    #[test]
    fn given_unknown_environment_when_resolving_then_lists_known() {
        let settings = Settings::default();
        let err = settings.environment("staging").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("staging"));
        assert!(msg.contains("dev"));
    }

    #[test]
    fn given_env_var_in_template_dir_when_expand_paths_then_expands_variable() {
        std::env::set_var("SNOWPROC_TEST_TEMPLATES", "/opt/templates");
        let mut settings = Settings {
            template_dir: Some(PathBuf::from("$SNOWPROC_TEST_TEMPLATES/proc")),
            ..Default::default()
        };

        settings.expand_paths();

        assert_eq!(
            settings.template_dir,
            Some(PathBuf::from("/opt/templates/proc"))
        );
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert_eq!(
            raw.environments.get("dev").unwrap().connection.as_deref(),
            Some("dev")
        );
    }
}
