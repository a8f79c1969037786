//! # tp-cli
//!
//! Command-line interface for Trip Planner.
//!
//! A thin collaborator over the planning core:
//! - `tp init` — create the `.tp/` directory, default rule tables, and plan document
//! - `tp destination add/remove/use` — manage trip legs
//! - `tp process status/dirty/clear` — drive the process lifecycle by hand
//! - `tp field set` — write a process field (marks it dirty)
//! - `tp cascade plan/apply` — dry-run or apply the dirty-flag cascade
//! - `tp status` — readiness report (text or JSON)
//! - `tp events` — tail the event log
//! - `tp check` — validate the schema and rule tables

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::PlannerConfig;

/// Trip Planner: process lifecycle, cascades, and readiness.
#[derive(Parser)]
#[command(name = "tp", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new plan in the project root.
    Init {
        /// Project name recorded in the plan document.
        project: String,
        /// Overwrite existing rule tables with the defaults.
        #[arg(long)]
        force: bool,
    },
    /// Manage destinations (trip legs).
    Destination {
        #[command(subcommand)]
        command: commands::destination::DestinationCommands,
    },
    /// Change a process's status or dirty flag.
    Process {
        #[command(subcommand)]
        command: commands::process::ProcessCommands,
    },
    /// Write process fields.
    Field {
        #[command(subcommand)]
        command: commands::field::FieldCommands,
    },
    /// Plan or apply the dirty-flag cascade.
    Cascade {
        #[command(subcommand)]
        command: commands::cascade::CascadeCommands,
    },
    /// Show the readiness report.
    Status {
        /// Destination to report on (defaults to the active one).
        #[arg(long)]
        destination: Option<String>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show recent plan events.
    Events {
        /// Number of events to show.
        #[arg(long, default_value = "20")]
        tail: usize,
    },
    /// Validate the schema, trigger table, and readiness rules.
    Check,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tp_cascade=info".parse()?)
                .add_directive("tp_plan=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = PlannerConfig::load_or_default(&project_root)?;

    match &cli.command {
        Commands::Init { project, force } => commands::init::execute(&config, project, *force),
        Commands::Destination { command } => commands::destination::execute(command, &config),
        Commands::Process { command } => commands::process::execute(command, &config),
        Commands::Field { command } => commands::field::execute(command, &config),
        Commands::Cascade { command } => commands::cascade::execute(command, &config),
        Commands::Status { destination, json } => {
            commands::status::execute(&config, destination.as_deref(), *json)
        }
        Commands::Events { tail } => commands::events::execute(&config, *tail),
        Commands::Check => commands::check::execute(&config),
    }
}
