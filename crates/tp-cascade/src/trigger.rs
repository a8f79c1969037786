// trigger.rs — Declarative cascade trigger rules.
//
// A trigger says: when a process matching `source_pattern` is dirty, do
// `action` to every process matching `targets`, in every destination
// (`global`) or only in the dirty entry's own destination
// (`current_destination`).
//
// Example table (YAML):
//
//   triggers:
//     - source_pattern: process_1_date_anchor
//       scope: global
//       targets: ["process_3_*", "process_4_*", "process_5_*"]
//       action: reset
//     - source_pattern: process_3_4_packages
//       scope: current_destination
//       targets: [process_3_transportation, process_4_accommodation]
//       action: populate
//       populate_spec:
//         source: chosen_offer
//         fields:
//           - { target: process_3_transportation, from: flight, to: flight }
//           - { target: process_4_accommodation, from: hotel, to: hotel }

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tp_plan::wildcard;
use tp_plan::{loader, SchemaContract};

use crate::error::CascadeError;
use crate::plan::ActionKind;

/// Which destinations a trigger's targets are resolved in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerScope {
    /// Every destination in the document.
    Global,
    /// The dirty entry's own destination (the active one for global sources).
    CurrentDestination,
}

/// One field copied by a populate action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCopy {
    /// Target process pattern this copy applies to.
    pub target: String,
    /// Path under the populate source object.
    pub from: String,
    /// Path under the target process's data.
    pub to: String,
}

/// Where populate data comes from and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulateSpec {
    /// Path of the source object within the dirty process's data
    /// (e.g. the chosen package offer).
    pub source: String,
    #[serde(default)]
    pub fields: Vec<FieldCopy>,
}

/// A single trigger rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    #[serde(alias = "source")]
    pub source_pattern: String,
    pub scope: TriggerScope,
    pub targets: Vec<String>,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub populate_spec: Option<PopulateSpec>,
}

impl TriggerRule {
    pub fn reset(source: &str, scope: TriggerScope, targets: &[&str]) -> Self {
        Self {
            source_pattern: source.to_string(),
            scope,
            targets: targets.iter().map(|t| t.to_string()).collect(),
            action: ActionKind::Reset,
            populate_spec: None,
        }
    }

    pub fn populate(
        source: &str,
        scope: TriggerScope,
        targets: &[&str],
        spec: PopulateSpec,
    ) -> Self {
        Self {
            source_pattern: source.to_string(),
            scope,
            targets: targets.iter().map(|t| t.to_string()).collect(),
            action: ActionKind::Populate,
            populate_spec: Some(spec),
        }
    }

    /// Whether a dirty `process` fires this rule.
    pub fn fires_for(&self, process: &str) -> bool {
        wildcard::matches(&self.source_pattern, process)
    }
}

/// The ordered trigger table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerTable {
    #[serde(default)]
    pub triggers: Vec<TriggerRule>,
}

impl TriggerTable {
    pub fn new(triggers: Vec<TriggerRule>) -> Self {
        Self { triggers }
    }

    /// Load from a JSON or YAML file.
    pub fn load(path: &Path) -> Result<Self, CascadeError> {
        Ok(loader::load_table(path)?)
    }

    /// Rules fired by a dirty `process`, with their table index.
    pub fn rules_for<'a>(
        &'a self,
        process: &'a str,
    ) -> impl Iterator<Item = (usize, &'a TriggerRule)> + 'a {
        self.triggers
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.fires_for(process))
    }

    /// Whether `process` is the source of an invalidation (reset) rule, so
    /// re-opening it must cascade further.
    pub fn has_reset_dependents(&self, process: &str) -> bool {
        self.rules_for(process)
            .any(|(_, rule)| rule.action == ActionKind::Reset)
    }

    /// Reject tables where a rule directly or transitively targets its own
    /// source, which would make cascades loop forever.
    pub fn validate(&self, schema: &SchemaContract) -> Result<(), CascadeError> {
        let nodes = &schema.process_nodes;
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for rule in &self.triggers {
            let targets = wildcard::expand_patterns(rule.targets.as_slice(), nodes);
            for source in wildcard::expand_wildcard(&rule.source_pattern, nodes) {
                edges
                    .entry(source)
                    .or_default()
                    .extend(targets.iter().cloned());
            }
        }

        let mut done = BTreeSet::new();
        for start in edges.keys() {
            let mut stack = Vec::new();
            if let Some(cycle) = find_cycle(start, &edges, &mut stack, &mut done) {
                return Err(CascadeError::TriggerCycle {
                    process: cycle[0].clone(),
                    path: cycle.join(" -> "),
                });
            }
        }
        Ok(())
    }
}

/// Depth-first search; returns the cycle (first node repeated at the end).
fn find_cycle(
    node: &str,
    edges: &BTreeMap<String, BTreeSet<String>>,
    stack: &mut Vec<String>,
    done: &mut BTreeSet<String>,
) -> Option<Vec<String>> {
    if let Some(pos) = stack.iter().position(|n| n == node) {
        let mut cycle = stack[pos..].to_vec();
        cycle.push(node.to_string());
        return Some(cycle);
    }
    if done.contains(node) {
        return None;
    }
    stack.push(node.to_string());
    if let Some(next) = edges.get(node) {
        for target in next {
            if let Some(cycle) = find_cycle(target, edges, stack, done) {
                return Some(cycle);
            }
        }
    }
    stack.pop();
    done.insert(node.to_string());
    None
}
