// check.rs — `tp check`: validate the schema and rule tables together.

use tp_cascade::{CascadeError, TriggerTable};
use tp_plan::{wildcard, SchemaContract};
use tp_readiness::ReadinessRules;

use crate::config::PlannerConfig;

pub fn execute(config: &PlannerConfig) -> anyhow::Result<()> {
    let schema = SchemaContract::load(&config.schema_file)?;
    let mut problems = schema.validate();

    let table = TriggerTable::load(&config.triggers_file)?;
    for (index, rule) in table.triggers.iter().enumerate() {
        let expanded = schema.expand(&rule.targets);
        for target in wildcard::validate_targets(&expanded, &schema.process_nodes) {
            problems.push(format!("trigger #{index}: unknown target '{target}'"));
        }
        if wildcard::expand_wildcard(&rule.source_pattern, &schema.process_nodes)
            .iter()
            .all(|source| !schema.contains(source))
        {
            problems.push(format!(
                "trigger #{index}: source '{}' matches no process",
                rule.source_pattern
            ));
        }
    }
    match table.validate(&schema) {
        Ok(()) => {}
        Err(CascadeError::TriggerCycle { path, .. }) => {
            problems.push(format!("trigger cycle: {path}"));
        }
        Err(e) => return Err(e.into()),
    }

    if config.readiness_file.exists() {
        let rules = ReadinessRules::load(&config.readiness_file)?;
        problems.extend(rules.validate(&schema));
    }

    if problems.is_empty() {
        println!(
            "OK: {} processes, {} triggers",
            schema.process_nodes.len(),
            table.triggers.len()
        );
        return Ok(());
    }
    for problem in &problems {
        println!("  {}", problem);
    }
    anyhow::bail!("{} problem(s) found", problems.len())
}
