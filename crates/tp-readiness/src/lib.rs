//! # tp-readiness
//!
//! Turns readiness rule results into a status report: whether each process
//! may proceed, where it stands in its ordered milestones, and a weighted
//! overall completion percentage.
//!
//! ## Key components
//!
//! - [`ReadinessRules`] — per-process `ready_to_proceed` and milestone rule
//!   blocks, plus the milestone order
//! - [`ReadinessReporter::evaluate`] — builds a [`StatusReport`] for one destination
//! - [`milestone_progress`] — contiguous-from-the-start milestone scan
//! - [`render_text`] — terminal rendering of a report

pub mod report;
pub mod rules;

pub use report::{
    milestone_progress, render_text, MilestoneProgress, ProcessReport, ReadinessReporter,
    ReportSummary, StatusReport,
};
pub use rules::{ProcessReadiness, ReadinessRules};
