//! # tp-cascade
//!
//! Turns "X became dirty" into a concrete, deterministic set of downstream
//! resets and populates, and applies it.
//!
//! Think of processes as build targets and dirty flags as staleness marks:
//! [`TriggerRule`]s are the dependency edges, and wildcard target patterns
//! let one rule address a whole family of processes.
//!
//! ## Key components
//!
//! - [`TriggerTable`] — the declarative rule table, with cycle validation
//! - [`CascadeEngine::compute_plan`] — pure: document snapshot in, [`CascadePlan`] out
//! - [`CascadeEngine::apply_plan`] — the only mutating step; all-or-nothing
//! - [`CascadeEngine::run_to_fixpoint`] — repeat until no dirty input is left
//!
//! ## Quick Example
//!
//! ```rust
//! use tp_cascade::{CascadeEngine, TriggerRule, TriggerScope, TriggerTable};
//! use tp_plan::{PlanDocument, ProcessKey, ProcessStatus, SchemaContract};
//!
//! let schema = SchemaContract::new(
//!     vec!["process_1_date_anchor".into(), "process_3_transportation".into()],
//!     vec!["process_1_date_anchor".into()],
//! );
//! let table = TriggerTable::new(vec![TriggerRule::reset(
//!     "process_1_date_anchor",
//!     TriggerScope::Global,
//!     &["process_3_*"],
//! )]);
//! let engine = CascadeEngine::new(table, schema.clone());
//!
//! let mut doc = PlanDocument::new("trip", &schema);
//! doc.add_destination("osaka", &schema).unwrap();
//! doc.mark_dirty(&ProcessKey::global("process_1_date_anchor"), None).unwrap();
//!
//! let plan = engine.compute_plan(&doc);
//! assert_eq!(plan.actions.len(), 1);
//! engine.apply_plan(&mut doc, &plan).unwrap();
//! assert!(engine.compute_plan(&doc).is_empty());
//! ```

pub mod engine;
pub mod error;
pub mod plan;
pub mod trigger;

pub use engine::{ApplyOutcome, CascadeEngine};
pub use error::CascadeError;
pub use plan::{ActionKind, CascadeAction, CascadePlan, PlanWarning};
pub use trigger::{FieldCopy, PopulateSpec, TriggerRule, TriggerScope, TriggerTable};
