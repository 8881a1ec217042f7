//! Tests for SnowparkService against a scripted snowsql runner.
#![cfg(unix)]

use std::collections::VecDeque;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use snowproc::application::services::SnowparkService;
use snowproc::application::{ApplicationError, SnowparkOps};
use snowproc::cli::CliError;
use snowproc::config::{EnvironmentConfig, Settings};
use snowproc::domain::{DeployAction, DomainError, ObjectKind, ProcedureSelector, ProcedureSpec};
use snowproc::exitcode;
use snowproc::infrastructure::traits::{CommandRunner, RealFileSystem};
use snowproc::util::testing;

// ============================================================
// Scripted command runner
// ============================================================

/// Replays canned outputs in order; succeeds with empty output once drained.
#[derive(Default)]
struct MockCommandRunner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    responses: Mutex<VecDeque<Output>>,
}

impl MockCommandRunner {
    fn respond(self, code: i32, stdout: &str, stderr: &str) -> Self {
        self.responses.lock().unwrap().push_back(Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        });
        self
    }

    /// The `-q` statement of every recorded call.
    fn statements(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, args)| {
                args.iter()
                    .position(|a| a == "-q")
                    .and_then(|i| args.get(i + 1).cloned())
            })
            .collect()
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        self.calls.lock().unwrap().push((
            cmd.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or(Output {
            status: ExitStatus::from_raw(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }))
    }
}

// ============================================================
// Helpers
// ============================================================

struct Fixture {
    temp: TempDir,
    cmd: Arc<MockCommandRunner>,
    service: SnowparkService,
    env: EnvironmentConfig,
}

fn fixture(cmd: MockCommandRunner) -> Fixture {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("app.zip"), b"PK").unwrap();

    let settings = Settings::default();
    let env = settings.environment("dev").unwrap();
    let cmd = Arc::new(cmd);
    let service = SnowparkService::new(
        Arc::new(RealFileSystem),
        cmd.clone(),
        Arc::new(settings),
        temp.path().to_path_buf(),
    );

    Fixture {
        temp,
        cmd,
        service,
        env,
    }
}

fn hello_spec() -> ProcedureSpec {
    ProcedureSpec {
        name: "hello".into(),
        file: PathBuf::from("app.zip"),
        handler: "app.hello".into(),
        input_parameters: "(message string)".into(),
        return_type: "string".into(),
        execute_as_caller: false,
    }
}

fn described(handler: &str) -> String {
    format!(
        r#"[
  {{"property": "signature", "value": "(MESSAGE VARCHAR)"}},
  {{"property": "returns", "value": "VARCHAR(16777216)"}},
  {{"property": "handler", "value": "{handler}"}},
  {{"property": "imports", "value": "[@DEPLOYMENTS/hello_string/app.zip]"}},
  {{"property": "execute as", "value": "OWNER"}}
]"#
    )
}

const MISSING: &str =
    "002003 (42S02): SQL compilation error:\nProcedure 'HELLO(VARCHAR)' does not exist or not authorized.";

// ============================================================
// create
// ============================================================

#[test]
fn given_spec_when_create_then_stage_put_and_create_run_in_order() {
    // Arrange
    let fx = fixture(MockCommandRunner::default());

    // Act
    let deployment = fx
        .service
        .create(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap();

    // Assert
    let statements = fx.cmd.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[0].starts_with("CREATE STAGE IF NOT EXISTS deployments"));
    assert!(statements[1].starts_with("PUT 'file://"));
    assert!(statements[1].ends_with("app.zip' @deployments/hello_string AUTO_COMPRESS=FALSE OVERWRITE=FALSE"));
    assert!(statements[2].starts_with("CREATE PROCEDURE hello(message string)\n"));
    assert!(statements[2].contains("IMPORTS = ('@deployments/hello_string/app.zip')"));
    assert!(statements[2].contains("PACKAGES = ('snowflake-snowpark-python')"));

    assert_eq!(deployment.signature, "hello(string)");
    assert_eq!(deployment.action, DeployAction::Created);
}

#[test]
fn given_overwrite_when_create_then_artifact_replaced_and_create_or_replace() {
    let fx = fixture(MockCommandRunner::default());

    fx.service
        .create(ObjectKind::Procedure, &fx.env, &hello_spec(), true)
        .unwrap();

    let statements = fx.cmd.statements();
    assert!(statements[1].ends_with("OVERWRITE=TRUE"));
    assert!(statements[2].starts_with("CREATE OR REPLACE PROCEDURE hello"));
}

#[test]
fn given_existing_procedure_when_create_without_overwrite_then_staged_artifact_kept() {
    // Arrange
    let fx = fixture(
        MockCommandRunner::default()
            .respond(0, "", "")
            .respond(0, "", "")
            .respond(1, "", "002002 (42710): SQL compilation error:\nObject 'HELLO' already exists."),
    );

    // Act
    let err = fx
        .service
        .create(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap_err();

    // Assert
    let statements = fx.cmd.statements();
    assert!(statements[1].starts_with("PUT "));
    assert!(statements[1].ends_with("OVERWRITE=FALSE"));
    assert!(!statements[1].contains("OVERWRITE=TRUE"));
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn given_requirements_file_when_create_then_packages_listed() {
    // Arrange
    let fx = fixture(MockCommandRunner::default());
    std::fs::write(
        fx.temp.path().join("requirements.snowflake.txt"),
        "# extra\npandas\n",
    )
    .unwrap();

    // Act
    fx.service
        .create(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap();

    // Assert
    assert!(fx.cmd.statements()[2]
        .contains("PACKAGES = ('snowflake-snowpark-python', 'pandas')"));
}

#[test]
fn given_environment_when_create_then_snowsql_uses_connection() {
    let fx = fixture(MockCommandRunner::default());

    fx.service
        .create(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap();

    let (program, args) = &fx.cmd.calls()[0];
    assert_eq!(program, "snowsql");
    assert_eq!(&args[..2], &["-c", "dev"]);
}

// ============================================================
// update
// ============================================================

#[test]
fn given_missing_procedure_when_update_then_creates_it() {
    // Arrange
    let fx = fixture(MockCommandRunner::default().respond(1, "", MISSING));

    // Act
    let deployment = fx
        .service
        .update(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap();

    // Assert
    let statements = fx.cmd.statements();
    assert_eq!(statements.len(), 4);
    assert_eq!(statements[0], "DESCRIBE PROCEDURE hello(string)");
    assert!(statements[3].starts_with("CREATE PROCEDURE hello"));
    assert_eq!(deployment.action, DeployAction::Created);
}

#[test]
fn given_unchanged_procedure_when_update_then_only_uploads() {
    // Arrange
    let fx = fixture(MockCommandRunner::default().respond(0, &described("app.hello"), ""));

    // Act
    let deployment = fx
        .service
        .update(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap();

    // Assert
    let statements = fx.cmd.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[2].starts_with("PUT "));
    assert!(statements[2].ends_with("OVERWRITE=TRUE"));
    assert_eq!(deployment.action, DeployAction::Uploaded);
}

#[test]
fn given_changed_handler_when_update_then_replaces() {
    // Arrange
    let fx = fixture(MockCommandRunner::default().respond(0, &described("app.old"), ""));

    // Act
    let deployment = fx
        .service
        .update(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap();

    // Assert
    let statements = fx.cmd.statements();
    assert_eq!(statements.len(), 4);
    assert!(statements[3].starts_with("CREATE OR REPLACE PROCEDURE hello"));
    assert_eq!(deployment.action, DeployAction::Replaced);
}

#[test]
fn given_replace_always_when_update_unchanged_then_replaces() {
    let fx = fixture(MockCommandRunner::default().respond(0, &described("app.hello"), ""));

    let deployment = fx
        .service
        .update(ObjectKind::Procedure, &fx.env, &hello_spec(), true)
        .unwrap();

    assert_eq!(deployment.action, DeployAction::Replaced);
    assert!(fx.cmd.statements()[3].starts_with("CREATE OR REPLACE"));
}

#[test]
fn given_describe_permission_error_when_update_then_fails_without_upload() {
    // Arrange
    let fx = fixture(MockCommandRunner::default().respond(1, "", "Insufficient privileges"));

    // Act
    let err = fx
        .service
        .update(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap_err();

    // Assert
    assert_eq!(fx.cmd.statements().len(), 1);
    assert!(err.to_string().contains("Insufficient privileges"));
}

#[test]
fn given_missing_database_when_update_then_fails_without_create() {
    // Arrange
    let fx = fixture(MockCommandRunner::default().respond(
        1,
        "",
        "002003 (02000): SQL compilation error:\nDatabase 'NOPE' does not exist or not authorized.",
    ));

    // Act
    let err = fx
        .service
        .update(ObjectKind::Procedure, &fx.env, &hello_spec(), false)
        .unwrap_err();

    // Assert
    assert_eq!(fx.cmd.statements().len(), 1);
    assert!(err.to_string().contains("Database 'NOPE'"));
}

// ============================================================
// execute / describe / list / drop
// ============================================================

#[test]
fn given_select_when_execute_then_call_statement_and_stdout_returned() {
    let fx = fixture(MockCommandRunner::default().respond(0, "| HELLO |\n| hi |\n", ""));

    let output = fx
        .service
        .execute(ObjectKind::Procedure, &fx.env, "hello('hi')")
        .unwrap();

    assert_eq!(fx.cmd.statements(), vec!["CALL hello('hi')"]);
    assert!(output.contains("hi"));
}

#[test]
fn given_name_and_parameters_when_describe_then_signature_from_types() {
    let fx = fixture(MockCommandRunner::default());
    let selector = ProcedureSelector {
        name: "hello".into(),
        input_parameters: "(message string, count int)".into(),
        signature: String::new(),
    };

    fx.service
        .describe(ObjectKind::Procedure, &fx.env, &selector)
        .unwrap();

    assert_eq!(
        fx.cmd.statements(),
        vec!["DESCRIBE PROCEDURE hello(string, int)"]
    );
}

#[test]
fn given_signature_when_drop_then_signature_wins() {
    let fx = fixture(MockCommandRunner::default());
    let selector = ProcedureSelector {
        name: "ignored".into(),
        input_parameters: "(x int)".into(),
        signature: "hello(string)".into(),
    };

    fx.service
        .drop_object(ObjectKind::Procedure, &fx.env, &selector)
        .unwrap();

    assert_eq!(fx.cmd.statements(), vec!["DROP PROCEDURE hello(string)"]);
}

#[test]
fn given_empty_selector_when_describe_then_missing_identity_and_no_query() {
    let fx = fixture(MockCommandRunner::default());

    let err = fx
        .service
        .describe(ObjectKind::Procedure, &fx.env, &ProcedureSelector::default())
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::MissingIdentity)
    ));
    assert!(fx.cmd.calls().is_empty());
}

#[test]
fn given_like_when_list_then_show_statement() {
    let fx = fixture(MockCommandRunner::default());

    fx.service
        .list(ObjectKind::Procedure, &fx.env, "%%")
        .unwrap();

    assert_eq!(
        fx.cmd.statements(),
        vec!["SHOW USER PROCEDURES LIKE '%%'"]
    );
}

#[test]
fn given_snowsql_failure_when_execute_then_unavailable_with_message() {
    // Arrange
    let fx = fixture(MockCommandRunner::default().respond(1, "", "Object 'HELLO' does not exist"));

    // Act
    let err = fx
        .service
        .execute(ObjectKind::Procedure, &fx.env, "hello()")
        .unwrap_err();

    // Assert
    let msg = err.to_string();
    assert!(msg.contains("CALL hello()"));
    assert!(msg.contains("does not exist"));
    assert_eq!(CliError::from(err).exit_code(), exitcode::UNAVAILABLE);
}
