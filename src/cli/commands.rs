//! Command dispatch: maps parsed arguments to plans and runs them.

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, info, instrument};

use crate::cli::args::{
    Cli, Commands, ConfigCommands, DeployArgs, ProcedureCommands, SelectorArgs,
};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, project_config_path, Settings};
use crate::domain::{Invocation, Outcome, Plan, ProcedureSelector, ProcedureSpec};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Entry point: wire real services for the current directory and run.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Commands::Completion { shell } = &cli.command {
        print_completions(*shell);
        return Ok(());
    }

    let project_dir = std::env::current_dir()
        .map_err(|e| InfraError::io("determine current directory", e))?;
    let container = ServiceContainer::load(&project_dir)?;
    execute_with(cli, &container)
}

/// Run a parsed command line against the given services.
pub fn execute_with(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    match &cli.command {
        Commands::Procedure { command } => {
            let outcomes = run_procedure(command, container)?;
            output::outcomes(&outcomes);
            Ok(())
        }
        Commands::Config { command } => run_config(command, container),
        Commands::Completion { shell } => {
            print_completions(*shell);
            Ok(())
        }
    }
}

/// Resolve the plan's environment once, then run every step.
#[instrument(skip(container))]
pub fn run_procedure(
    command: &ProcedureCommands,
    container: &ServiceContainer,
) -> CliResult<Vec<Outcome>> {
    let plan = procedure_plan(command);
    let env = plan
        .environment
        .as_deref()
        .map(|name| container.settings.environment(name))
        .transpose()?;
    if let Some(env) = &env {
        info!("environment: {} (connection {:?})", env.name, env.connection);
    }

    let outcomes = container.procedure_dispatcher().run(&plan, env.as_ref())?;
    debug!("run_procedure: {} steps done", outcomes.len());
    Ok(outcomes)
}

/// Map a procedure subcommand to its plan.
pub fn procedure_plan(command: &ProcedureCommands) -> Plan {
    match command {
        ProcedureCommands::Init => Plan::local(vec![Invocation::Init]),
        ProcedureCommands::Package => Plan::local(vec![Invocation::Package]),
        ProcedureCommands::Create(args) => Plan::remote(
            &args.deploy.env.environment,
            vec![
                Invocation::Package,
                Invocation::Create {
                    spec: procedure_spec(&args.deploy),
                    overwrite: args.overwrite,
                },
            ],
        ),
        ProcedureCommands::Update(args) => Plan::remote(
            &args.deploy.env.environment,
            vec![
                Invocation::Package,
                Invocation::Update {
                    spec: procedure_spec(&args.deploy),
                    replace: args.replace,
                },
            ],
        ),
        ProcedureCommands::Execute(args) => Plan::remote(
            &args.env.environment,
            vec![Invocation::Execute {
                select: args.select.clone(),
            }],
        ),
        ProcedureCommands::Describe(args) => Plan::remote(
            &args.env.environment,
            vec![Invocation::Describe(procedure_selector(args))],
        ),
        ProcedureCommands::List(args) => Plan::remote(
            &args.env.environment,
            vec![Invocation::List {
                like: args.like.clone(),
            }],
        ),
        ProcedureCommands::Drop(args) => Plan::remote(
            &args.env.environment,
            vec![Invocation::Drop(procedure_selector(args))],
        ),
    }
}

fn procedure_spec(args: &DeployArgs) -> ProcedureSpec {
    ProcedureSpec {
        name: args.name.clone(),
        file: args.file.clone(),
        handler: args.handler.clone(),
        input_parameters: args.input_parameters.clone(),
        return_type: args.return_type.clone(),
        execute_as_caller: args.execute_as_caller,
    }
}

fn procedure_selector(args: &SelectorArgs) -> ProcedureSelector {
    ProcedureSelector {
        name: args.name.clone(),
        input_parameters: args.input_parameters.clone(),
        signature: args.signature.clone(),
    }
}

fn run_config(command: &ConfigCommands, container: &ServiceContainer) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            let global = global_config_path();
            let project = project_config_path(&container.project_dir);
            match &global {
                Some(path) => output::action("global", &describe_path(container, path)),
                None => output::action("global", "(no config directory on this platform)"),
            }
            output::action("project", &describe_path(container, &project));
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("no global config directory on this platform".into())
                })?
            } else {
                project_config_path(&container.project_dir)
            };
            if container.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .map_err(|e| InfraError::io(format!("create {}", path.display()), e))?;
            container
                .fs
                .write_bytes(&path, Settings::template().as_bytes())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("Created {}", path.display()));
            Ok(())
        }
    }
}

fn describe_path(container: &ServiceContainer, path: &Path) -> String {
    if container.fs.exists(path) {
        path.display().to_string()
    } else {
        format!("{} (missing)", path.display())
    }
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
