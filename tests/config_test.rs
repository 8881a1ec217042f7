//! Integration tests for layered Settings loading.
//!
//! Layers (lowest to highest): defaults, global file, project file,
//! `SNOWPROC__*` environment variables. Environments merge per name and
//! per field; scalars are replaced.
//!
//! Tests pass an explicit (possibly missing) global path so the developer's
//! own config never leaks in.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use snowproc::application::ApplicationError;
use snowproc::config::{project_config_path, Settings};

// ============================================================
// File layers
// ============================================================

#[test]
fn given_no_config_files_when_load_then_defaults() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let global = temp.path().join("global.toml");

    // Act
    let settings = Settings::load_layers(Some(&global), Some(temp.path())).unwrap();

    // Assert
    assert_eq!(settings.stage, "deployments");
    assert_eq!(settings.package.artifact, PathBuf::from("app.zip"));
    assert_eq!(
        settings.environment("dev").unwrap().connection.as_deref(),
        Some("dev")
    );
}

#[test]
fn given_project_config_when_load_then_environments_added_and_merged() {
    // Arrange
    let temp = TempDir::new().unwrap();
    fs::write(
        project_config_path(temp.path()),
        r#"
stage = "artifacts"

[environments.dev]
database = "DEV_DB"

[environments.prod]
connection = "prod"
database = "PROD_DB"
schema = "PUBLIC"
warehouse = "PROD_WH"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_layers(None, Some(temp.path())).unwrap();

    // Assert
    assert_eq!(settings.stage, "artifacts");
    let dev = settings.environment("dev").unwrap();
    assert_eq!(dev.connection.as_deref(), Some("dev"));
    assert_eq!(dev.database.as_deref(), Some("DEV_DB"));
    let prod = settings.environment("prod").unwrap();
    assert_eq!(prod.name, "prod");
    assert_eq!(prod.schema.as_deref(), Some("PUBLIC"));
    assert_eq!(prod.warehouse.as_deref(), Some("PROD_WH"));
}

#[test]
fn given_global_and_project_config_when_load_then_project_wins() {
    // Arrange
    let global_dir = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    let global = global_dir.path().join("snowproc.toml");
    fs::write(
        &global,
        r#"
snowsql_path = "/opt/snowsql/snowsql"
runtime_version = "3.10"

[environments.dev]
role = "GLOBAL_ROLE"
warehouse = "GLOBAL_WH"
"#,
    )
    .unwrap();
    fs::write(
        project_config_path(project.path()),
        r#"
runtime_version = "3.11"

[environments.dev]
role = "PROJECT_ROLE"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_layers(Some(&global), Some(project.path())).unwrap();

    // Assert
    assert_eq!(settings.snowsql_path, "/opt/snowsql/snowsql");
    assert_eq!(settings.runtime_version, "3.11");
    let dev = settings.environment("dev").unwrap();
    assert_eq!(dev.role.as_deref(), Some("PROJECT_ROLE"));
    assert_eq!(dev.warehouse.as_deref(), Some("GLOBAL_WH"));
}

#[test]
fn given_invalid_project_config_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();
    fs::write(project_config_path(temp.path()), "stage = [not toml").unwrap();

    let err = Settings::load_layers(None, Some(temp.path())).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

// ============================================================
// Environment variable layer
// ============================================================

#[test]
fn given_env_var_environment_when_load_then_overrides_files() {
    // Arrange
    let temp = TempDir::new().unwrap();
    fs::write(
        project_config_path(temp.path()),
        r#"
[environments.envoverride]
connection = "from_file"
database = "FILE_DB"
"#,
    )
    .unwrap();
    std::env::set_var("SNOWPROC__ENVIRONMENTS__ENVOVERRIDE__DATABASE", "ENV_DB");

    // Act
    let settings = Settings::load_layers(None, Some(temp.path()));
    std::env::remove_var("SNOWPROC__ENVIRONMENTS__ENVOVERRIDE__DATABASE");

    // Assert
    let env = settings.unwrap().environment("envoverride").unwrap();
    assert_eq!(env.database.as_deref(), Some("ENV_DB"));
    assert_eq!(env.connection.as_deref(), Some("from_file"));
}

// ============================================================
// Rendering
// ============================================================

#[test]
fn given_settings_when_to_toml_then_reloadable() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let shown = Settings::default().to_toml().unwrap();
    fs::write(project_config_path(temp.path()), &shown).unwrap();

    // Act
    let reloaded = Settings::load_layers(None, Some(temp.path())).unwrap();

    // Assert
    let defaults = Settings::default();
    assert_eq!(reloaded.snowsql_path, defaults.snowsql_path);
    assert_eq!(reloaded.package, defaults.package);
    assert_eq!(
        reloaded.environment("dev").unwrap(),
        defaults.environment("dev").unwrap()
    );
}

// ============================================================
// config command
// ============================================================

#[test]
fn given_no_project_config_when_config_init_then_template_written_once() {
    use clap::Parser;
    use snowproc::cli::commands::execute_with;
    use snowproc::cli::Cli;
    use snowproc::exitcode;
    use snowproc::infrastructure::di::ServiceContainer;

    // Arrange
    let temp = TempDir::new().unwrap();
    let container = ServiceContainer::new(Settings::default(), temp.path().to_path_buf());
    let cli = Cli::try_parse_from(["snowproc", "config", "init"]).unwrap();

    // Act
    execute_with(&cli, &container).unwrap();
    let second = execute_with(&cli, &container).unwrap_err();

    // Assert
    let written = fs::read_to_string(project_config_path(temp.path())).unwrap();
    assert_eq!(written, Settings::template());
    assert_eq!(second.exit_code(), exitcode::USAGE);
}
