// plan.rs — CascadePlan: the computed, not-yet-applied set of actions.
//
// A plan is plain data. It can be printed as JSON for a dry run and thrown
// away, or handed to `CascadeEngine::apply_plan`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tp_plan::ProcessKey;
use uuid::Uuid;

/// What an action does to its target. Resets sort before populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Force the target back to pending.
    Reset,
    /// Copy upstream fields into the target and mark it populated.
    Populate,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Reset => write!(f, "reset"),
            ActionKind::Populate => write!(f, "populate"),
        }
    }
}

/// One resolved (destination, process) action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeAction {
    /// `None` for global processes.
    #[serde(default)]
    pub destination: Option<String>,
    pub process: String,
    pub kind: ActionKind,

    /// Populate only: flat object of `target field path → value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Leave the target dirty after applying, because it has further
    /// reset dependents of its own.
    #[serde(default)]
    pub propagate: bool,

    /// The dirty entries that produced this action.
    #[serde(default)]
    pub triggered_by: Vec<ProcessKey>,
}

impl CascadeAction {
    pub fn key(&self) -> ProcessKey {
        ProcessKey {
            destination: self.destination.clone(),
            process: self.process.clone(),
        }
    }
}

/// A recoverable problem found while computing a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// An expanded trigger target is not in the schema contract.
    SchemaViolation { rule: usize, target: String },
    /// A scoped destination does not exist in the document.
    MissingDestination { rule: usize, destination: String },
    /// A `current_destination` rule fired for a global source with no
    /// active destination to resolve it to.
    NoActiveDestination { rule: usize, source: String },
    /// A populate rule's source object is absent from the dirty process.
    PopulateSourceMissing {
        rule: usize,
        source: String,
        path: String,
    },
    /// A populate was dropped because its target or its source is reset
    /// in the same plan.
    PopulateSuperseded { target: String, reset: String },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::SchemaViolation { rule, target } => {
                write!(f, "trigger #{rule}: target '{target}' is not a known process; dropped")
            }
            PlanWarning::MissingDestination { rule, destination } => {
                write!(f, "trigger #{rule}: destination '{destination}' not found; skipped")
            }
            PlanWarning::NoActiveDestination { rule, source } => {
                write!(f, "trigger #{rule}: no active destination for global source {source}; skipped")
            }
            PlanWarning::PopulateSourceMissing { rule, source, path } => {
                write!(f, "trigger #{rule}: {source} has no '{path}' to populate from; skipped")
            }
            PlanWarning::PopulateSuperseded { target, reset } => {
                write!(f, "populate of {target} dropped: {reset} is reset in the same plan")
            }
        }
    }
}

/// The output of `CascadeEngine::compute_plan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadePlan {
    pub plan_id: Uuid,
    pub computed_at: DateTime<Utc>,

    /// Document version the plan was computed against.
    pub document_version: u64,

    /// Dirty entries consumed by this plan (cleared on apply).
    pub inputs: Vec<ProcessKey>,

    /// Deduplicated, sorted by (destination, process, kind).
    pub actions: Vec<CascadeAction>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PlanWarning>,
}

impl CascadePlan {
    pub fn new(document_version: u64) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            computed_at: Utc::now(),
            document_version,
            inputs: Vec::new(),
            actions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// True when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn resets(&self) -> impl Iterator<Item = &CascadeAction> {
        self.actions.iter().filter(|a| a.kind == ActionKind::Reset)
    }

    pub fn populates(&self) -> impl Iterator<Item = &CascadeAction> {
        self.actions.iter().filter(|a| a.kind == ActionKind::Populate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_serializes_for_dry_run() {
        let mut plan = CascadePlan::new(7);
        plan.actions.push(CascadeAction {
            destination: Some("osaka".into()),
            process: "process_4_accommodation".into(),
            kind: ActionKind::Populate,
            payload: Some(json!({ "hotel": { "name": "Hotel Nikko" } })),
            propagate: false,
            triggered_by: vec![ProcessKey::at("osaka", "process_3_4_packages")],
        });
        plan.warnings.push(PlanWarning::SchemaViolation {
            rule: 0,
            target: "process_7_typo".into(),
        });

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["document_version"], 7);
        assert_eq!(json["actions"][0]["kind"], "populate");
        assert_eq!(json["actions"][0]["destination"], "osaka");
        assert_eq!(json["warnings"][0]["kind"], "schema_violation");

        let back: CascadePlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn reset_orders_before_populate() {
        assert!(ActionKind::Reset < ActionKind::Populate);
    }

    #[test]
    fn empty_plan_omits_warnings() {
        let plan = CascadePlan::new(0);
        assert!(plan.is_empty());
        let json = serde_json::to_value(&plan).unwrap();
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn warning_messages_name_the_problem() {
        let w = PlanWarning::MissingDestination {
            rule: 2,
            destination: "tokyo".into(),
        };
        assert_eq!(w.to_string(), "trigger #2: destination 'tokyo' not found; skipped");
    }

    #[test]
    fn superseded_populate_names_the_reset() {
        let w = PlanWarning::PopulateSuperseded {
            target: "osaka/process_3_transportation".into(),
            reset: "osaka/process_3_4_packages".into(),
        };
        assert_eq!(
            w.to_string(),
            "populate of osaka/process_3_transportation dropped: osaka/process_3_4_packages is reset in the same plan"
        );
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "populate_superseded");
    }
}
