//! Command-line definition

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use kav::{CommandRouter, TracingFormat};
use std::path::PathBuf;

use crate::app::AppState;

#[derive(Debug, Parser)]
#[command(
    name = "kav",
    version = kav::version_short(),
    about = "Kubernetes access viewer: RBAC permissions as markdown tables"
)]
pub struct Cli {
    /// Config file (default: <config dir>/kav/config.json)
    #[arg(long, global = true, env = "KAV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value_t = OutputFormat::Markdown)]
    pub output: OutputFormat,

    /// Log format: pretty, compact or json
    #[arg(long, global = true, default_value = "compact", env = "KAV_LOG_FORMAT")]
    pub log_format: TracingFormat,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// rakkess binary
    #[arg(long, global = true, env = "KAV_RAKKESS_PATH")]
    pub rakkess_path: Option<PathBuf>,

    /// kubectl-who-can binary
    #[arg(long, global = true, env = "KAV_WHO_CAN_PATH")]
    pub who_can_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown tables, through the loading viewer
    #[default]
    Markdown,
    /// Parsed model as JSON
    Json,
}

#[derive(Debug, Subcommand, CommandRouter)]
#[router(state = AppState)]
pub enum Command {
    /// Show what the current identity may do, cluster-wide or in a namespace
    #[router(handler = crate::handlers::access)]
    Access(AccessArgs),

    /// Show which subjects may perform a verb on a resource
    #[router(handler = crate::handlers::who_can)]
    WhoCan(WhoCanArgs),

    /// Show `cluster`, `namespace/<name>` or a resource (with --verb)
    #[router(handler = crate::handlers::view)]
    View(ViewArgs),

    /// Print the effective configuration
    #[router(handler = crate::handlers::config)]
    Config,

    /// Print version and build information
    #[router(handler = crate::handlers::version)]
    Version,
}

#[derive(Debug, Args)]
pub struct AccessArgs {
    /// Only this namespace
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,
}

#[derive(Debug, Args)]
pub struct WhoCanArgs {
    /// Verb, e.g. get or delete
    pub verb: String,

    /// Resource kind, or kind/name
    pub resource: String,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// cluster, namespace/<name> (or ns/<name>), or a resource
    pub target: String,

    /// Verb to ask about when the target is a resource
    #[arg(long)]
    pub verb: Option<String>,
}
