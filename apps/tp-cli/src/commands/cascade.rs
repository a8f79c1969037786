// cascade.rs — Cascade subcommands: plan (dry run), apply.

use clap::Subcommand;

use super::Planner;
use crate::config::PlannerConfig;

#[derive(Subcommand)]
pub enum CascadeCommands {
    /// Compute the plan for the current dirty flags and print it as JSON.
    /// Nothing is changed.
    Plan,
    /// Compute and apply plans until no dirty input is left.
    Apply {
        /// Maximum rounds (defaults to `[cascade] max_rounds`).
        #[arg(long)]
        max_rounds: Option<usize>,
    },
}

pub fn execute(cmd: &CascadeCommands, config: &PlannerConfig) -> anyhow::Result<()> {
    let planner = Planner::open(config)?;
    let engine = planner.engine()?;
    let (mut doc, base) = planner.load()?;

    match cmd {
        CascadeCommands::Plan => {
            let plan = engine.compute_plan(&doc);
            for warning in &plan.warnings {
                eprintln!("warning: {}", warning);
            }
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        CascadeCommands::Apply { max_rounds } => {
            let rounds = max_rounds.unwrap_or(config.cascade.max_rounds);
            let run = engine.run_to_fixpoint(&mut doc, rounds)?;
            for warning in &run.warnings {
                eprintln!("warning: {}", warning);
            }
            if run.plans.is_empty() {
                println!("Nothing to cascade.");
                return Ok(());
            }
            planner.commit(&doc, base, &run.events)?;

            for (round, plan) in run.plans.iter().enumerate() {
                println!("Round {}:", round + 1);
                for action in &plan.actions {
                    let triggers: Vec<String> =
                        action.triggered_by.iter().map(ToString::to_string).collect();
                    println!(
                        "  {:<9} {:<40} <- {}",
                        action.kind.to_string(),
                        action.key().to_string(),
                        triggers.join(", ")
                    );
                }
            }
            println!(
                "Applied {} action(s) in {} round(s); plan is now at version {}.",
                run.action_count(),
                run.rounds(),
                doc.version
            );
            let remaining = doc.dirty_keys();
            if !remaining.is_empty() {
                println!("Still dirty (no trigger consumes them):");
                for key in remaining {
                    println!("  {}", key);
                }
            }
        }
    }
    Ok(())
}
