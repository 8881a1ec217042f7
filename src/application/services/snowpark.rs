//! Snowpark service: packaging plus remote operations through snowsql
//!
//! Every statement runs as a separate `snowsql -q` invocation against the
//! resolved environment's connection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::services::PackageService;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt, SnowparkOps};
use crate::config::{EnvironmentConfig, Settings};
use crate::domain::sql::{self, Runtime, StageTarget};
use crate::domain::{
    resolve_signature, DeployAction, Deployment, ObjectKind, ProcedureSelector, ProcedureSpec,
};
use crate::infrastructure::traits::{CommandRunner, FileSystem};
use crate::infrastructure::InfraError;

/// snowsql output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    Psql,
    /// JSON array of row objects
    Json,
}

impl OutputFormat {
    fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Psql => "psql",
            OutputFormat::Json => "json",
        }
    }
}

/// Build the snowsql argument list for one statement.
pub fn snowsql_args(env: &EnvironmentConfig, sql: &str, format: OutputFormat) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(connection) = &env.connection {
        args.extend(["-c".to_string(), connection.clone()]);
    }
    let scoped = [
        ("-d", &env.database),
        ("-s", &env.schema),
        ("-r", &env.role),
        ("-w", &env.warehouse),
    ];
    for (flag, value) in scoped {
        if let Some(value) = value {
            args.extend([flag.to_string(), value.clone()]);
        }
    }
    for option in [
        "exit_on_error=true".to_string(),
        "friendly=false".to_string(),
        "timing=false".to_string(),
        format!("output_format={}", format.as_str()),
    ] {
        args.extend(["-o".to_string(), option]);
    }
    args.extend(["-q".to_string(), sql.to_string()]);
    args
}

/// Whether an error is snowsql reporting that the object itself is missing.
fn is_missing_object(err: &ApplicationError, kind: ObjectKind) -> bool {
    match err {
        ApplicationError::OperationFailed { source, .. } => source
            .downcast_ref::<InfraError>()
            .is_some_and(|e| e.is_missing_object(kind.sql_keyword())),
        _ => false,
    }
}

/// Real helper layer backed by `zip` packaging and the snowsql client.
pub struct SnowparkService {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
    project_dir: PathBuf,
    packager: PackageService,
}

impl SnowparkService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        settings: Arc<Settings>,
        project_dir: PathBuf,
    ) -> Self {
        let packager = PackageService::new(fs.clone(), settings.clone(), project_dir.clone());
        Self {
            fs,
            cmd,
            settings,
            project_dir,
            packager,
        }
    }

    /// Run one statement; returns snowsql's stdout.
    pub fn query(
        &self,
        env: &EnvironmentConfig,
        statement: &str,
        format: OutputFormat,
    ) -> ApplicationResult<String> {
        let args = snowsql_args(env, statement, format);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!("query: env={}, sql={}", env.name, statement);

        let snowsql = &self.settings.snowsql_path;
        let result = self
            .cmd
            .run(snowsql, &arg_refs)
            .with_context(|| format!("run {snowsql}"))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let message = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&result.stdout).trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            let head = statement.lines().next().unwrap_or_default();
            return Err(ApplicationError::OperationFailed {
                context: format!("{head}: {message}"),
                source: Box::new(InfraError::Snowsql {
                    message,
                    exit_code: result.status.code(),
                }),
            });
        }

        Ok(String::from_utf8_lossy(&result.stdout).into_owned())
    }

    fn resolve_local(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    fn stage_target(
        &self,
        env: &EnvironmentConfig,
        spec: &ProcedureSpec,
    ) -> ApplicationResult<StageTarget> {
        let directory = sql::deploy_directory(&spec.name, &spec.input_parameters)?;
        let local = self.resolve_local(&spec.file);
        // A folder artifact is imported as the whole stage directory.
        let file_name = if self.fs.is_dir(&local) {
            String::new()
        } else {
            spec.file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        Ok(StageTarget {
            stage: sql::qualified_stage(
                &self.settings.stage,
                env.database.as_deref(),
                env.schema.as_deref(),
            ),
            directory,
            file_name,
        })
    }

    fn runtime(&self) -> ApplicationResult<Runtime> {
        let path = self.project_dir.join(&self.settings.package.requirements);
        let requirements = if self.fs.exists(&path) {
            self.fs
                .read_to_string(&path)
                .with_path_context("read requirements", &path)?
        } else {
            String::new()
        };
        Ok(Runtime {
            version: self.settings.runtime_version.clone(),
            packages: sql::packages_from_requirements(&requirements),
        })
    }

    /// Ensure the stage exists and upload the artifact to it.
    ///
    /// Without `overwrite` an artifact already on the stage is kept.
    fn upload(
        &self,
        env: &EnvironmentConfig,
        spec: &ProcedureSpec,
        target: &StageTarget,
        overwrite: bool,
    ) -> ApplicationResult<()> {
        self.query(env, &sql::create_stage(&target.stage), OutputFormat::Psql)?;

        let local = self.resolve_local(&spec.file);
        let local = self
            .fs
            .canonicalize(&local)
            .with_path_context("resolve artifact", &local)?;
        let statement = sql::put(&local, self.fs.is_dir(&local), target, overwrite);
        self.query(env, &statement, OutputFormat::Psql)?;
        info!("uploaded {} to {}", local.display(), target.location());
        Ok(())
    }

    fn create_object(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        spec: &ProcedureSpec,
        target: &StageTarget,
        replace: bool,
    ) -> ApplicationResult<()> {
        let runtime = self.runtime()?;
        let statement = sql::create_procedure(kind, spec, target, &runtime, replace);
        self.query(env, &statement, OutputFormat::Psql)?;
        Ok(())
    }

    fn spec_signature(spec: &ProcedureSpec) -> ApplicationResult<String> {
        Ok(resolve_signature(&ProcedureSelector {
            name: spec.name.clone(),
            input_parameters: spec.input_parameters.clone(),
            signature: String::new(),
        })?)
    }
}

impl SnowparkOps for SnowparkService {
    fn package(&self) -> ApplicationResult<PathBuf> {
        self.packager.package()
    }

    fn create(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        spec: &ProcedureSpec,
        overwrite: bool,
    ) -> ApplicationResult<Deployment> {
        let signature = Self::spec_signature(spec)?;
        debug!("create: {} {}, overwrite={}", kind, signature, overwrite);
        let target = self.stage_target(env, spec)?;

        self.upload(env, spec, &target, overwrite)?;
        self.create_object(kind, env, spec, &target, overwrite)?;

        Ok(Deployment {
            kind,
            signature,
            action: DeployAction::Created,
        })
    }

    fn update(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        spec: &ProcedureSpec,
        replace: bool,
    ) -> ApplicationResult<Deployment> {
        let signature = Self::spec_signature(spec)?;
        debug!("update: {} {}, replace={}", kind, signature, replace);
        let target = self.stage_target(env, spec)?;

        let described = match self.query(env, &sql::describe(kind, &signature), OutputFormat::Json)
        {
            Ok(output) => Some(sql::parse_describe_output(&output)?),
            Err(e) if is_missing_object(&e, kind) => None,
            Err(e) => return Err(e),
        };

        self.upload(env, spec, &target, true)?;

        let action = match described {
            None => {
                info!("{} {} does not exist, creating", kind, signature);
                self.create_object(kind, env, spec, &target, false)?;
                DeployAction::Created
            }
            Some(properties) => {
                let changed = sql::changed_properties(&properties, spec, &target);
                if replace || !changed.is_empty() {
                    info!("replacing {} {}: changed={:?}", kind, signature, changed);
                    self.create_object(kind, env, spec, &target, true)?;
                    DeployAction::Replaced
                } else {
                    DeployAction::Uploaded
                }
            }
        };

        Ok(Deployment {
            kind,
            signature,
            action,
        })
    }

    fn execute(
        &self,
        _kind: ObjectKind,
        env: &EnvironmentConfig,
        select: &str,
    ) -> ApplicationResult<String> {
        self.query(env, &sql::call(select), OutputFormat::Psql)
    }

    fn describe(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        selector: &ProcedureSelector,
    ) -> ApplicationResult<String> {
        let signature = resolve_signature(selector)?;
        self.query(env, &sql::describe(kind, &signature), OutputFormat::Psql)
    }

    fn list(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        like: &str,
    ) -> ApplicationResult<String> {
        self.query(env, &sql::show(kind, like), OutputFormat::Psql)
    }

    fn drop_object(
        &self,
        kind: ObjectKind,
        env: &EnvironmentConfig,
        selector: &ProcedureSelector,
    ) -> ApplicationResult<String> {
        let signature = resolve_signature(selector)?;
        self.query(env, &sql::drop(kind, &signature), OutputFormat::Psql)
    }
}
