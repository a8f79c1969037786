// error.rs — Error types for cascade planning and application.
//
// Only contract violations are errors. Recoverable planning problems
// (unknown targets, missing destinations, absent populate sources) are
// PlanWarnings carried on the plan instead.

use thiserror::Error;
use tp_plan::PlanError;

#[derive(Debug, Error)]
pub enum CascadeError {
    /// The document changed after the plan was computed.
    #[error("stale plan: computed at document version {plan_version}, document is at {document_version}")]
    StalePlan {
        plan_version: u64,
        document_version: u64,
    },

    /// A plan action names a process outside the schema contract.
    #[error("plan action targets unknown process: {0}")]
    UnknownProcess(String),

    /// A trigger rule directly or transitively targets its own source.
    #[error("trigger cycle through {process}: {path}")]
    TriggerCycle { process: String, path: String },

    /// Repeated cascade rounds kept producing actions.
    #[error("cascade did not converge after {rounds} rounds")]
    NotConverged { rounds: usize },

    /// Document, loading, or persistence failure.
    #[error(transparent)]
    Plan(#[from] PlanError),
}
