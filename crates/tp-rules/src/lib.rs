//! # tp-rules
//!
//! Readiness rule language and evaluator for Trip Planner.
//!
//! Rules are small boolean predicate trees over an arbitrary JSON document.
//! A process may advance only when its `ready_to_proceed` block passes, and
//! progress reporting evaluates one block per milestone.
//!
//! ## Key components
//!
//! - [`path`] — typed dot-path traversal (`resolve`) and assignment (`assign`)
//! - [`Rule`] / [`RuleBlock`] — the rule tree (`present`, `min_length`,
//!   `for_each`, nested `all` / `any`)
//! - [`evaluate_rule_block`] — fail-closed evaluation producing a [`RuleOutcome`]
//!
//! ## Quick Example
//!
//! ```rust
//! use serde_json::json;
//! use tp_rules::evaluate_rule_block;
//!
//! let block = json!({ "all": [ { "present": "flight.number" } ] });
//! let data = json!({ "flight": { "number": "IT200" } });
//! assert!(evaluate_rule_block(Some(&block), &data).passed);
//!
//! // A missing block never passes.
//! assert!(!evaluate_rule_block(None, &data).passed);
//! ```

pub mod error;
pub mod evaluator;
pub mod path;
pub mod rule;

pub use error::{MalformedRule, PathError};
pub use evaluator::{evaluate_block, evaluate_rule, evaluate_rule_block, RuleOutcome};
pub use rule::{Rule, RuleBlock};
