//! Domain entities: core data structures

use std::fmt;
use std::path::PathBuf;

/// Kind of remote object a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Procedure,
}

impl ObjectKind {
    /// Keyword used in SQL statements (`PROCEDURE`).
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            ObjectKind::Procedure => "PROCEDURE",
        }
    }

    /// Plural keyword used by `SHOW` statements.
    pub fn sql_plural(&self) -> &'static str {
        match self {
            ObjectKind::Procedure => "PROCEDURES",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Procedure => write!(f, "procedure"),
        }
    }
}

/// Everything needed to deploy a procedure, built per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSpec {
    pub name: String,
    /// Artifact to upload (file or folder), e.g. `app.zip`
    pub file: PathBuf,
    /// Fully qualified handler, e.g. `app.hello`
    pub handler: String,
    /// Free-form parameter list, e.g. `(message string, count int)`
    pub input_parameters: String,
    pub return_type: String,
    pub execute_as_caller: bool,
}

impl ProcedureSpec {
    /// Parameter list as it appears in DDL, always parenthesized.
    pub fn parameter_list(&self) -> String {
        let trimmed = self.input_parameters.trim();
        if trimmed.starts_with('(') {
            trimmed.to_string()
        } else {
            format!("({trimmed})")
        }
    }
}

/// Identity of an existing procedure.
///
/// The three fields are alternative spellings of the same identity; an empty
/// string means "not given". Resolution happens in the helper layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureSelector {
    pub name: String,
    pub input_parameters: String,
    pub signature: String,
}

/// A single call into the helper layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Init,
    Package,
    Create { spec: ProcedureSpec, overwrite: bool },
    Update { spec: ProcedureSpec, replace: bool },
    Execute { select: String },
    Describe(ProcedureSelector),
    List { like: String },
    Drop(ProcedureSelector),
}

impl Invocation {
    /// Whether this step talks to the warehouse and thus needs an environment.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Invocation::Init | Invocation::Package)
    }
}

/// Ordered steps for one command, plus the environment they run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub environment: Option<String>,
    pub steps: Vec<Invocation>,
}

impl Plan {
    /// Plan without an environment (local-only steps).
    pub fn local(steps: Vec<Invocation>) -> Self {
        Self {
            environment: None,
            steps,
        }
    }

    pub fn remote(environment: impl Into<String>, steps: Vec<Invocation>) -> Self {
        Self {
            environment: Some(environment.into()),
            steps,
        }
    }
}

/// What a deploy ended up doing on the warehouse side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    /// Procedure did not exist and was created
    Created,
    /// Procedure was recreated with `CREATE OR REPLACE`
    Replaced,
    /// Only the artifact was uploaded; metadata unchanged
    Uploaded,
}

impl fmt::Display for DeployAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployAction::Created => write!(f, "created"),
            DeployAction::Replaced => write!(f, "replaced"),
            DeployAction::Uploaded => write!(f, "uploaded"),
        }
    }
}

/// Result of a create/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub kind: ObjectKind,
    pub signature: String,
    pub action: DeployAction,
}

/// Result of one executed step, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Initialized { files: Vec<PathBuf> },
    Packaged { artifact: PathBuf },
    Deployed(Deployment),
    Output(String),
}

/// Expand `~`, `$VAR` and `${VAR}` in a path-like string.
///
/// Returns the input unchanged when expansion fails.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
