// field.rs — Field subcommands: set, get.

use clap::Subcommand;
use serde_json::Value;

use super::Planner;
use crate::config::PlannerConfig;

#[derive(Subcommand)]
pub enum FieldCommands {
    /// Write a field into a process's data and mark the process dirty.
    Set {
        process: String,
        /// Dot path under the process data (e.g., "chosen_offer.flight").
        path: String,
        /// JSON value; anything that is not valid JSON is stored as a string.
        value: String,
        #[arg(long)]
        destination: Option<String>,
    },
    /// Print a field (or the whole process data) as JSON.
    Get {
        process: String,
        path: Option<String>,
        #[arg(long)]
        destination: Option<String>,
    },
}

pub fn execute(cmd: &FieldCommands, config: &PlannerConfig) -> anyhow::Result<()> {
    let planner = Planner::open(config)?;
    let (mut doc, base) = planner.load()?;

    match cmd {
        FieldCommands::Set {
            process,
            path,
            value,
            destination,
        } => {
            let key = doc.resolve_key(destination.as_deref(), process)?;
            let event = doc.set_field(&key, path, parse_value(value))?;
            planner.commit(&doc, base, &[event])?;
            println!("{}: set {} (dirty)", key, path);
        }
        FieldCommands::Get {
            process,
            path,
            destination,
        } => {
            let key = doc.resolve_key(destination.as_deref(), process)?;
            let Some(state) = doc.state(&key) else {
                anyhow::bail!("no state for {}", key);
            };
            let value = match path {
                Some(p) => field_at(&state.data, p)?,
                None => state.data.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn field_at(data: &Value, path: &str) -> anyhow::Result<Value> {
    Ok(tp_rules::path::resolve(data, path)?.clone())
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
