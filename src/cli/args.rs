//! CLI argument definitions using clap

use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::config::DEFAULT_ENVIRONMENT;

/// Create, update, execute and inspect Snowflake stored procedures
#[derive(Parser, Debug)]
#[command(name = "snowproc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage procedures
    Procedure {
        #[command(subcommand)]
        command: ProcedureCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProcedureCommands {
    /// Initialize this directory with a sample set of files to create a procedure
    Init,

    /// Package the project and create a procedure
    #[command(disable_help_flag = true)]
    Create(CreateArgs),

    /// Package the project and update a procedure
    #[command(disable_help_flag = true)]
    Update(UpdateArgs),

    /// Package the project into its artifact
    Package,

    /// Call a procedure
    Execute(ExecuteArgs),

    /// Describe a procedure
    Describe(SelectorArgs),

    /// List procedures
    List(ListArgs),

    /// Drop a procedure
    Drop(SelectorArgs),
}

/// Target environment, resolved from configuration before anything runs.
#[derive(Args, Debug, Clone)]
pub struct EnvironmentArgs {
    /// Environment name
    #[arg(long, default_value = DEFAULT_ENVIRONMENT, env = "SNOWPROC_ENVIRONMENT")]
    pub environment: String,
}

/// Flags shared by create and update.
#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub env: EnvironmentArgs,

    /// Name of the procedure
    #[arg(short, long)]
    pub name: String,

    /// Path to the file or folder to deploy
    #[arg(short, long, default_value = "app.zip", value_parser = readable_path, value_hint = ValueHint::AnyPath)]
    pub file: PathBuf,

    /// Handler
    #[arg(short = 'h', long)]
    pub handler: String,

    /// Input parameters - such as (message string, count int)
    #[arg(short, long)]
    pub input_parameters: String,

    /// Return type
    #[arg(short, long)]
    pub return_type: String,

    /// Execute as caller
    #[arg(long)]
    pub execute_as_caller: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[command(flatten)]
    pub deploy: DeployArgs,

    /// Replace if existing procedure
    #[arg(short, long)]
    pub overwrite: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub deploy: DeployArgs,

    /// Replace procedure, even if no detected changes to metadata
    #[arg(long = "replace-always")]
    pub replace: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExecuteArgs {
    #[command(flatten)]
    pub env: EnvironmentArgs,

    /// Procedure with inputs, e.g. 'hello(int, string)'
    #[arg(short = 'p', long = "procedure")]
    pub select: String,
}

/// Identity of an existing procedure; every field may be left empty.
#[derive(Args, Debug, Clone)]
pub struct SelectorArgs {
    #[command(flatten)]
    pub env: EnvironmentArgs,

    /// Name of the procedure
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Input parameters - such as (message string, count int)
    #[arg(short, long, default_value = "")]
    pub input_parameters: String,

    /// Procedure signature with inputs, e.g. 'hello(int, string)'
    #[arg(short = 'p', long = "procedure", default_value = "")]
    pub signature: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub env: EnvironmentArgs,

    /// Filter procedures by name, e.g. "hello%"
    #[arg(short, long, default_value = "%%")]
    pub like: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

/// Accept a path only if it exists and can be read (file or folder).
fn readable_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    let metadata =
        fs::metadata(&path).map_err(|_| format!("path '{value}' does not exist"))?;
    let readable = if metadata.is_dir() {
        fs::read_dir(&path).map(|_| ())
    } else {
        fs::File::open(&path).map(|_| ())
    };
    readable.map_err(|e| format!("path '{value}' is not readable: {e}"))?;
    Ok(path)
}
