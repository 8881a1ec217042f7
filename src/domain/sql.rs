//! SQL statement rendering and describe-output interpretation.
//!
//! Pure functions only; execution lives in the snowpark service.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::domain::{parameter_types, DomainError, ObjectKind, ProcedureSpec};

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid separator pattern"));

/// Package every Python procedure needs at runtime.
pub const SNOWPARK_PACKAGE: &str = "snowflake-snowpark-python";

/// Quote a string literal, doubling embedded single quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Stage name qualified with database and schema where known.
pub fn qualified_stage(stage: &str, database: Option<&str>, schema: Option<&str>) -> String {
    match (database, schema) {
        (Some(db), Some(schema)) => format!("{db}.{schema}.{stage}"),
        (None, Some(schema)) => format!("{schema}.{stage}"),
        _ => stage.to_string(),
    }
}

/// Stage directory for a procedure's artifact.
///
/// Lower-cased name followed by the parameter types, with every run of
/// non-alphanumerics collapsed to `_`: `hello(string, int)` → `hello_string_int`.
pub fn deploy_directory(name: &str, input_parameters: &str) -> Result<String, DomainError> {
    let types = parameter_types(input_parameters)?;
    let raw = std::iter::once(name.to_string())
        .chain(types)
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    Ok(SEPARATORS
        .replace_all(&raw, "_")
        .trim_matches('_')
        .to_string())
}

/// Where an artifact lands on the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTarget {
    /// Qualified stage name, without `@`
    pub stage: String,
    /// Directory inside the stage
    pub directory: String,
    /// File name of the artifact inside the directory
    pub file_name: String,
}

impl StageTarget {
    /// Stage location of the directory, e.g. `@db.s.deployments/hello`.
    pub fn location(&self) -> String {
        format!("@{}/{}", self.stage, self.directory)
    }

    /// Stage path of the artifact, as referenced in `IMPORTS`.
    pub fn import_path(&self) -> String {
        format!("{}/{}", self.location(), self.file_name)
    }
}

pub fn create_stage(stage: &str) -> String {
    format!(
        "CREATE STAGE IF NOT EXISTS {stage} COMMENT = {}",
        quote("deployments managed by snowproc")
    )
}

/// `PUT` statement uploading a local file, or every file of a folder.
///
/// Without `overwrite`, files already on the stage are left untouched.
pub fn put(local: &Path, is_dir: bool, target: &StageTarget, overwrite: bool) -> String {
    let mut source = local.to_string_lossy().replace('\\', "/");
    if is_dir {
        source.push_str("/*");
    }
    format!(
        "PUT {} {} AUTO_COMPRESS=FALSE OVERWRITE={}",
        quote(&format!("file://{source}")),
        target.location(),
        if overwrite { "TRUE" } else { "FALSE" }
    )
}

/// Python runtime settings for a procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    pub version: String,
    pub packages: Vec<String>,
}

pub fn create_procedure(
    kind: ObjectKind,
    spec: &ProcedureSpec,
    target: &StageTarget,
    runtime: &Runtime,
    replace: bool,
) -> String {
    let verb = if replace {
        "CREATE OR REPLACE"
    } else {
        "CREATE"
    };
    let packages = runtime
        .packages
        .iter()
        .map(|p| quote(p))
        .collect::<Vec<_>>()
        .join(", ");
    let execute_as = if spec.execute_as_caller {
        "CALLER"
    } else {
        "OWNER"
    };
    format!(
        "{verb} {keyword} {name}{params}\n\
         RETURNS {returns}\n\
         LANGUAGE PYTHON\n\
         RUNTIME_VERSION = {runtime}\n\
         IMPORTS = ({import})\n\
         HANDLER = {handler}\n\
         PACKAGES = ({packages})\n\
         EXECUTE AS {execute_as}",
        keyword = kind.sql_keyword(),
        name = spec.name,
        params = spec.parameter_list(),
        returns = spec.return_type,
        runtime = quote(&runtime.version),
        import = quote(&target.import_path()),
        handler = quote(&spec.handler),
    )
}

pub fn call(select: &str) -> String {
    format!("CALL {select}")
}

pub fn describe(kind: ObjectKind, signature: &str) -> String {
    format!("DESCRIBE {} {signature}", kind.sql_keyword())
}

pub fn show(kind: ObjectKind, like: &str) -> String {
    format!("SHOW USER {} LIKE {}", kind.sql_plural(), quote(like))
}

pub fn drop(kind: ObjectKind, signature: &str) -> String {
    format!("DROP {} {signature}", kind.sql_keyword())
}

/// Collect the package list: the snowpark package first, then requirements.
///
/// Blank lines and `#` comments are skipped; duplicates are dropped.
pub fn packages_from_requirements(requirements: &str) -> Vec<String> {
    let mut packages = vec![SNOWPARK_PACKAGE.to_string()];
    for line in requirements.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !packages.iter().any(|p| p == line) {
            packages.push(line.to_string());
        }
    }
    packages
}

#[derive(Debug, Deserialize)]
struct DescribeRow {
    #[serde(alias = "PROPERTY")]
    property: String,
    #[serde(alias = "VALUE")]
    value: Option<String>,
}

/// Parse `DESCRIBE` JSON output into lower-cased property → value.
pub fn parse_describe_output(json: &str) -> Result<BTreeMap<String, String>, DomainError> {
    let rows: Vec<DescribeRow> =
        serde_json::from_str(json.trim()).map_err(|e| DomainError::InvalidDescribeOutput {
            message: e.to_string(),
        })?;
    Ok(rows
        .into_iter()
        .map(|row| (row.property.to_lowercase(), row.value.unwrap_or_default()))
        .collect())
}

/// Canonical form of a SQL type for comparison.
///
/// `varchar(16777216)` and `string` both become `VARCHAR`.
pub fn normalize_type(ty: &str) -> String {
    let upper = ty.trim().to_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();
    match base {
        "STRING" | "TEXT" | "CHAR" | "CHARACTER" => "VARCHAR".to_string(),
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "BYTEINT" | "DECIMAL"
        | "NUMERIC" => "NUMBER".to_string(),
        "DOUBLE" | "DOUBLE PRECISION" | "REAL" | "FLOAT4" | "FLOAT8" => "FLOAT".to_string(),
        other => other.to_string(),
    }
}

/// Names of the described properties that differ from the requested deploy.
///
/// Empty when the existing procedure already matches.
pub fn changed_properties(
    described: &BTreeMap<String, String>,
    spec: &ProcedureSpec,
    target: &StageTarget,
) -> Vec<&'static str> {
    let value = |key: &str| described.get(key).map(String::as_str).unwrap_or_default();
    let mut changed = Vec::new();

    if value("handler") != spec.handler {
        changed.push("handler");
    }
    if normalize_type(value("returns")) != normalize_type(&spec.return_type) {
        changed.push("returns");
    }
    // described imports are fully qualified
    let import = target.import_path().trim_start_matches('@').to_lowercase();
    if !value("imports").to_lowercase().contains(&import) {
        changed.push("imports");
    }
    let execute_as = if spec.execute_as_caller {
        "CALLER"
    } else {
        "OWNER"
    };
    if !value("execute as").eq_ignore_ascii_case(execute_as) {
        changed.push("execute as");
    }
    changed
}
