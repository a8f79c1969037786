//! # tp-plan
//!
//! Process lifecycle, destinations, and dirty-flag bookkeeping for Trip Planner.
//!
//! A [`PlanDocument`] holds one [`ProcessState`] per (destination, process)
//! pair plus one per global process. Every identifier comes from the
//! [`SchemaContract`]; [`wildcard`] expands prefix patterns against it.
//!
//! ## Key components
//!
//! - [`ProcessStatus`] — the lifecycle (pending → researching → researched
//!   → selecting → selected → booking → booked → confirmed, plus the side
//!   states skipped and populated)
//! - [`PlanDocument`] — destinations, status changes, dirty flags, field writes
//! - [`PlanEvent`] / [`EventLog`] — the append-only JSONL audit trail
//! - [`DocumentStore`] — JSON persistence with a compare-and-swap version check

pub mod document;
pub mod error;
pub mod events;
pub mod loader;
pub mod process;
pub mod schema;
pub mod status;
pub mod store;
pub mod wildcard;

pub use document::{Destination, PlanDocument};
pub use error::PlanError;
pub use events::{EventKind, EventLog, PlanEvent};
pub use process::{ProcessKey, ProcessState};
pub use schema::SchemaContract;
pub use status::{is_valid_transition, ProcessStatus, TransitionCause};
pub use store::DocumentStore;
