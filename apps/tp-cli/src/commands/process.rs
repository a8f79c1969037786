// process.rs — Process subcommands: status, dirty, clear.

use clap::Subcommand;
use tp_plan::ProcessStatus;

use super::Planner;
use crate::config::PlannerConfig;

#[derive(Subcommand)]
pub enum ProcessCommands {
    /// Move a process to a new status (forward only, or skipped/populated).
    Status {
        /// Process identifier (e.g., "process_3_transportation").
        process: String,
        /// Target status (e.g., "selected").
        status: String,
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Mark a process dirty so the next cascade picks it up.
    Dirty {
        process: String,
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Clear a dirty flag that no trigger consumes.
    Clear {
        process: String,
        #[arg(long)]
        destination: Option<String>,
    },
}

pub fn execute(cmd: &ProcessCommands, config: &PlannerConfig) -> anyhow::Result<()> {
    let planner = Planner::open(config)?;
    let (mut doc, base) = planner.load()?;

    match cmd {
        ProcessCommands::Status {
            process,
            status,
            destination,
            reason,
        } => {
            let to: ProcessStatus = status.parse()?;
            let key = doc.resolve_key(destination.as_deref(), process)?;
            let from = doc.state(&key).map(|s| s.status);
            let event = doc.set_process_status(&key, to, reason.clone())?;
            planner.commit(&doc, base, &[event])?;
            match from {
                Some(from) => println!("{}: {} -> {}", key, from, to),
                None => println!("{}: {}", key, to),
            }
        }
        ProcessCommands::Dirty {
            process,
            destination,
            reason,
        } => {
            let key = doc.resolve_key(destination.as_deref(), process)?;
            let event = doc.mark_dirty(&key, reason.clone())?;
            planner.commit(&doc, base, &[event])?;
            println!("{} marked dirty", key);
        }
        ProcessCommands::Clear {
            process,
            destination,
        } => {
            let key = doc.resolve_key(destination.as_deref(), process)?;
            if doc.clear_dirty(&key)? {
                planner.commit(&doc, base, &[])?;
                println!("{} is clean", key);
            } else {
                println!("{} was not dirty", key);
            }
        }
    }
    Ok(())
}
