// rules.rs — The readiness rules document.
//
// Rule blocks are kept as raw JSON so a malformed block still loads; it
// simply evaluates to "not passed" with a diagnostic when a report runs.
//
// Example (YAML):
//
//   processes:
//     process_3_transportation:
//       weight: 2
//       ready_to_proceed:
//         all:
//           - present: process_3_transportation.flight.number
//       milestones:
//         options_found:
//           all: [{ min_length: process_3_transportation.options, min: 1 }]
//         flight_chosen:
//           all: [{ present: process_3_transportation.flight }]
//   milestone_order:
//     process_3_transportation: [options_found, flight_chosen]

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tp_plan::{loader, PlanError, SchemaContract};

fn default_weight() -> f64 {
    1.0
}

/// Readiness rules for one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessReadiness {
    /// May the process advance? Absent means never ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_to_proceed: Option<Value>,

    /// Named checkpoints, each its own rule block.
    #[serde(default)]
    pub milestones: BTreeMap<String, Value>,

    /// Share of the overall readiness score.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Default for ProcessReadiness {
    fn default() -> Self {
        Self {
            ready_to_proceed: None,
            milestones: BTreeMap::new(),
            weight: default_weight(),
        }
    }
}

/// Readiness rules for every process plus the milestone orderings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessRules {
    #[serde(default)]
    pub processes: BTreeMap<String, ProcessReadiness>,

    /// Per-process milestone order. Not derivable from `milestones`, which
    /// is keyed by name.
    #[serde(default)]
    pub milestone_order: BTreeMap<String, Vec<String>>,
}

impl ReadinessRules {
    /// Load from a JSON or YAML file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        loader::load_table(path)
    }

    pub fn for_process(&self, process: &str) -> Option<&ProcessReadiness> {
        self.processes.get(process)
    }

    /// The ordered milestones of `process` (empty when none are declared).
    pub fn order(&self, process: &str) -> &[String] {
        self.milestone_order
            .get(process)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn weight(&self, process: &str) -> f64 {
        self.for_process(process)
            .map(|p| p.weight)
            .unwrap_or_else(default_weight)
    }

    /// Inconsistencies worth telling the author about. Empty means clean.
    pub fn validate(&self, schema: &SchemaContract) -> Vec<String> {
        let mut issues = Vec::new();
        for (process, rules) in &self.processes {
            if !schema.contains(process) {
                issues.push(format!("rules for unknown process: {process}"));
            }
            if !rules.weight.is_finite() || rules.weight < 0.0 {
                issues.push(format!("{process}: weight must be a non-negative number"));
            }
        }
        for (process, order) in &self.milestone_order {
            if !schema.contains(process) {
                issues.push(format!("milestone order for unknown process: {process}"));
            }
            let declared = self.for_process(process).map(|p| &p.milestones);
            for name in order {
                if !declared.is_some_and(|m| m.contains_key(name)) {
                    issues.push(format!("{process}: milestone '{name}' has no rule block"));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
processes:
  process_3_transportation:
    weight: 2
    ready_to_proceed:
      all:
        - present: process_3_transportation.flight.number
    milestones:
      options_found:
        all: [{ min_length: process_3_transportation.options, min: 1 }]
      flight_chosen:
        all: [{ present: process_3_transportation.flight }]
  process_4_accommodation:
    ready_to_proceed: { any: [] }
milestone_order:
  process_3_transportation: [options_found, flight_chosen, booked]
"#;

    fn schema() -> SchemaContract {
        SchemaContract::new(
            vec![
                "process_3_transportation".into(),
                "process_4_accommodation".into(),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn loads_yaml_with_defaults() {
        let rules: ReadinessRules = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(rules.weight("process_3_transportation"), 2.0);
        assert_eq!(rules.weight("process_4_accommodation"), 1.0);
        assert_eq!(rules.weight("process_5_daily_itinerary"), 1.0);
        assert_eq!(rules.order("process_3_transportation").len(), 3);
        assert!(rules.order("process_4_accommodation").is_empty());
    }

    #[test]
    fn malformed_blocks_still_load() {
        let rules: ReadinessRules = serde_yaml::from_str(YAML).unwrap();
        let accommodation = rules.for_process("process_4_accommodation").unwrap();
        assert!(accommodation.ready_to_proceed.is_some());
        assert!(accommodation.milestones.is_empty());
    }

    #[test]
    fn validate_flags_undeclared_milestones() {
        let rules: ReadinessRules = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(
            rules.validate(&schema()),
            vec!["process_3_transportation: milestone 'booked' has no rule block"]
        );
    }

    #[test]
    fn validate_flags_unknown_processes() {
        let mut rules = ReadinessRules::default();
        rules
            .processes
            .insert("process_9_ghost".into(), ProcessReadiness::default());
        let issues = rules.validate(&schema());
        assert_eq!(issues, vec!["rules for unknown process: process_9_ghost"]);
    }
}
