//! Plan execution: routes each invocation to the helper layer.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::{TemplateService, TemplateSource};
use crate::application::{ApplicationError, ApplicationResult, SnowparkOps};
use crate::config::EnvironmentConfig;
use crate::domain::{Invocation, ObjectKind, Outcome, Plan};

/// Runs plans for one object kind.
pub struct Dispatcher {
    kind: ObjectKind,
    snowpark: Arc<dyn SnowparkOps>,
    templates: TemplateService,
    template_source: TemplateSource,
    project_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(
        kind: ObjectKind,
        snowpark: Arc<dyn SnowparkOps>,
        templates: TemplateService,
        template_source: TemplateSource,
        project_dir: PathBuf,
    ) -> Self {
        Self {
            kind,
            snowpark,
            templates,
            template_source,
            project_dir,
        }
    }

    /// Run every step of the plan in order, stopping at the first failure.
    ///
    /// `env` is the already-resolved environment; steps that talk to the
    /// warehouse fail with `MissingEnvironment` without it.
    #[instrument(skip(self, env), fields(kind = %self.kind))]
    pub fn run(
        &self,
        plan: &Plan,
        env: Option<&EnvironmentConfig>,
    ) -> ApplicationResult<Vec<Outcome>> {
        plan.steps.iter().map(|step| self.step(step, env)).collect()
    }

    fn step(
        &self,
        step: &Invocation,
        env: Option<&EnvironmentConfig>,
    ) -> ApplicationResult<Outcome> {
        debug!("step: {:?}", step);
        if !step.is_remote() {
            return self.local_step(step);
        }

        let kind = self.kind;
        let env = env.ok_or_else(|| ApplicationError::MissingEnvironment {
            step: format!("{kind} {}", step_name(step)),
        })?;

        let outcome = match step {
            Invocation::Create { spec, overwrite } => {
                Outcome::Deployed(self.snowpark.create(kind, env, spec, *overwrite)?)
            }
            Invocation::Update { spec, replace } => {
                Outcome::Deployed(self.snowpark.update(kind, env, spec, *replace)?)
            }
            Invocation::Execute { select } => {
                Outcome::Output(self.snowpark.execute(kind, env, select)?)
            }
            Invocation::Describe(selector) => {
                Outcome::Output(self.snowpark.describe(kind, env, selector)?)
            }
            Invocation::List { like } => Outcome::Output(self.snowpark.list(kind, env, like)?),
            Invocation::Drop(selector) => {
                Outcome::Output(self.snowpark.drop_object(kind, env, selector)?)
            }
            Invocation::Init | Invocation::Package => return self.local_step(step),
        };
        Ok(outcome)
    }

    /// Steps that run on this machine only.
    fn local_step(&self, step: &Invocation) -> ApplicationResult<Outcome> {
        match step {
            Invocation::Init => Ok(Outcome::Initialized {
                files: self
                    .templates
                    .init(&self.template_source, &self.project_dir)?,
            }),
            Invocation::Package => Ok(Outcome::Packaged {
                artifact: self.snowpark.package()?,
            }),
            other => Err(ApplicationError::MissingEnvironment {
                step: format!("{} {}", self.kind, step_name(other)),
            }),
        }
    }
}

fn step_name(step: &Invocation) -> &'static str {
    match step {
        Invocation::Init => "init",
        Invocation::Package => "package",
        Invocation::Create { .. } => "create",
        Invocation::Update { .. } => "update",
        Invocation::Execute { .. } => "execute",
        Invocation::Describe(_) => "describe",
        Invocation::List { .. } => "list",
        Invocation::Drop(_) => "drop",
    }
}
