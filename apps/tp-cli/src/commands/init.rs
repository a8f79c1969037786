// init.rs — `tp init`: create the .tp/ directory with default tables.

use std::fs;
use std::path::Path;

use tp_plan::{DocumentStore, PlanDocument, SchemaContract};

use crate::config::PlannerConfig;

const DEFAULT_SCHEMA: &str = r#"{
  "process_nodes": [
    "process_1_date_anchor",
    "process_2_destination",
    "process_3_4_packages",
    "process_3_transportation",
    "process_4_accommodation",
    "process_5_daily_itinerary"
  ],
  "global_nodes": ["process_1_date_anchor"]
}
"#;

const DEFAULT_TRIGGERS: &str = r#"# Cascade triggers: when a source process is dirty, reset or populate targets.
triggers:
  # Moving the trip dates reopens every leg.
  - source_pattern: process_1_date_anchor
    scope: global
    targets: ["process_3_*", "process_4_*", "process_5_*"]
    action: reset

  - source_pattern: process_2_destination
    scope: current_destination
    targets: ["process_3_*", "process_4_*", "process_5_*"]
    action: reset

  # A chosen package fills in transport and accommodation.
  - source_pattern: process_3_4_packages
    scope: current_destination
    targets: [process_3_transportation, process_4_accommodation]
    action: populate
    populate_spec:
      source: chosen_offer
      fields:
        - { target: process_3_transportation, from: flight, to: flight }
        - { target: process_4_accommodation, from: hotel, to: hotel }

  - source_pattern: process_3_transportation
    scope: current_destination
    targets: [process_5_daily_itinerary]
    action: reset

  - source_pattern: process_4_accommodation
    scope: current_destination
    targets: [process_5_daily_itinerary]
    action: reset
"#;

const DEFAULT_READINESS: &str = r#"{
  "processes": {
    "process_1_date_anchor": {
      "weight": 2,
      "ready_to_proceed": {
        "all": [
          { "present": "process_1_date_anchor.start" },
          { "present": "process_1_date_anchor.end" }
        ]
      }
    },
    "process_2_destination": {
      "ready_to_proceed": { "all": [ { "present": "process_2_destination.city" } ] }
    },
    "process_3_transportation": {
      "ready_to_proceed": { "all": [ { "present": "process_3_transportation.flight" } ] },
      "milestones": {
        "options_found": { "all": [ { "min_length": "process_3_transportation.options", "min": 1 } ] },
        "flight_chosen": { "all": [ { "present": "process_3_transportation.flight" } ] },
        "booked": { "all": [ { "present": "process_3_transportation.booking_ref" } ] }
      }
    },
    "process_4_accommodation": {
      "ready_to_proceed": { "all": [ { "present": "process_4_accommodation.hotel" } ] },
      "milestones": {
        "options_found": { "all": [ { "min_length": "process_4_accommodation.options", "min": 1 } ] },
        "hotel_chosen": { "all": [ { "present": "process_4_accommodation.hotel" } ] },
        "booked": { "all": [ { "present": "process_4_accommodation.booking_ref" } ] }
      }
    },
    "process_5_daily_itinerary": {
      "ready_to_proceed": {
        "all": [
          { "min_length": "process_5_daily_itinerary.days", "min": 1 },
          { "for_each": "process_5_daily_itinerary.days", "all": [ { "present": "date" } ] }
        ]
      }
    }
  },
  "milestone_order": {
    "process_3_transportation": ["options_found", "flight_chosen", "booked"],
    "process_4_accommodation": ["options_found", "hotel_chosen", "booked"]
  }
}
"#;

pub fn execute(config: &PlannerConfig, project: &str, force: bool) -> anyhow::Result<()> {
    fs::create_dir_all(&config.state_dir)?;

    write_default(&config.schema_file, DEFAULT_SCHEMA, force)?;
    write_default(&config.triggers_file, DEFAULT_TRIGGERS, force)?;
    write_default(&config.readiness_file, DEFAULT_READINESS, force)?;

    let store = DocumentStore::new(&config.plan_file);
    if store.exists() {
        println!("Plan already exists at {}", config.plan_file.display());
        return Ok(());
    }
    let schema = SchemaContract::load(&config.schema_file)?;
    let issues = schema.validate();
    if !issues.is_empty() {
        anyhow::bail!("schema {} is invalid:\n  {}", config.schema_file.display(), issues.join("\n  "));
    }
    store.create(&PlanDocument::new(project, &schema))?;

    println!("Initialized plan '{}' in {}", project, config.state_dir.display());
    println!("  Next: tp destination add <name>");
    Ok(())
}

fn write_default(path: &Path, content: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        tracing::debug!("keeping existing {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    println!("  wrote {}", path.display());
    Ok(())
}
