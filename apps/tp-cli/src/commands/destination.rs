// destination.rs — Destination subcommands: add, remove, use, list.

use clap::Subcommand;

use super::Planner;
use crate::config::PlannerConfig;

#[derive(Subcommand)]
pub enum DestinationCommands {
    /// Create a destination with a pending copy of every process.
    Add {
        /// Destination name (e.g., "osaka").
        name: String,
    },
    /// Remove a destination and all of its process states.
    Remove { name: String },
    /// Make a destination the active one.
    Use { name: String },
    /// List destinations.
    List,
}

pub fn execute(cmd: &DestinationCommands, config: &PlannerConfig) -> anyhow::Result<()> {
    let planner = Planner::open(config)?;
    let (mut doc, base) = planner.load()?;

    match cmd {
        DestinationCommands::Add { name } => {
            let event = doc.add_destination(name, &planner.schema)?;
            planner.commit(&doc, base, &[event])?;
            println!("Added destination {}", name);
            if doc.active_destination.as_deref() == Some(name.as_str()) {
                println!("  (now active)");
            }
        }
        DestinationCommands::Remove { name } => {
            let event = doc.remove_destination(name)?;
            planner.commit(&doc, base, &[event])?;
            println!("Removed destination {}", name);
        }
        DestinationCommands::Use { name } => {
            doc.set_active_destination(name)?;
            planner.commit(&doc, base, &[])?;
            println!("Active destination: {}", name);
        }
        DestinationCommands::List => {
            if doc.destinations.is_empty() {
                println!("No destinations. Add one with `tp destination add <name>`.");
                return Ok(());
            }
            for (name, dest) in &doc.destinations {
                let marker = if doc.active_destination.as_deref() == Some(name.as_str()) {
                    "*"
                } else {
                    " "
                };
                let dirty = dest.processes.values().filter(|s| s.dirty).count();
                println!(
                    "{} {:<20} created {}  {} dirty",
                    marker,
                    name,
                    dest.created_at.format("%Y-%m-%d"),
                    dirty
                );
            }
        }
    }
    Ok(())
}
