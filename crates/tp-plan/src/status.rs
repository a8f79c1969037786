// status.rs — The process lifecycle state machine.
//
// Forward order:
//   Pending → Researching → Researched → Selecting → Selected
//     → Booking → Booked → Confirmed
//
// Any forward move is allowed as long as it goes strictly later (steps may
// be skipped, never repeated or reversed). Two side states sit outside the
// order and are reachable from anywhere:
//   Skipped   — user override; nothing moves forward out of it.
//   Populated — filled in from an upstream selection by a cascade; it
//               continues forward as if it were Selected.
//
// The only way back to Pending is a cascade reset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// The lifecycle status of one process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Pending,
    Researching,
    Researched,
    Selecting,
    Selected,
    Booking,
    Booked,
    Confirmed,
    Skipped,
    Populated,
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// A user or agent advancing the process.
    Direct,
    /// A cascade re-opening the process after upstream data changed.
    CascadeReset,
}

impl ProcessStatus {
    /// The forward lifecycle, in order.
    pub const FORWARD: [ProcessStatus; 8] = [
        ProcessStatus::Pending,
        ProcessStatus::Researching,
        ProcessStatus::Researched,
        ProcessStatus::Selecting,
        ProcessStatus::Selected,
        ProcessStatus::Booking,
        ProcessStatus::Booked,
        ProcessStatus::Confirmed,
    ];

    /// Position in the forward order, or `None` for the side states.
    pub fn rank(self) -> Option<usize> {
        Self::FORWARD.iter().position(|s| *s == self)
    }

    /// Whether this is one of the side states outside the forward order.
    pub fn is_side_state(self) -> bool {
        matches!(self, ProcessStatus::Skipped | ProcessStatus::Populated)
    }

    /// The rank a transition starts from. Populated continues as Selected;
    /// Skipped has no forward exit.
    fn departure_rank(self) -> Option<usize> {
        match self {
            ProcessStatus::Populated => ProcessStatus::Selected.rank(),
            other => other.rank(),
        }
    }

    /// Check whether a direct (non-cascade) move to `next` is valid.
    pub fn can_transition_to(&self, next: ProcessStatus) -> bool {
        is_valid_transition(*self, next, TransitionCause::Direct)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::Pending => "pending",
            ProcessStatus::Researching => "researching",
            ProcessStatus::Researched => "researched",
            ProcessStatus::Selecting => "selecting",
            ProcessStatus::Selected => "selected",
            ProcessStatus::Booking => "booking",
            ProcessStatus::Booked => "booked",
            ProcessStatus::Confirmed => "confirmed",
            ProcessStatus::Skipped => "skipped",
            ProcessStatus::Populated => "populated",
        }
    }
}

/// Check whether moving from `from` to `to` is allowed.
///
/// - a cascade reset to `Pending` is always allowed
/// - `Skipped` and `Populated` are reachable from any state
/// - otherwise `to` must be strictly later than `from` in the forward order
pub fn is_valid_transition(from: ProcessStatus, to: ProcessStatus, cause: TransitionCause) -> bool {
    if cause == TransitionCause::CascadeReset && to == ProcessStatus::Pending {
        return true;
    }
    if to.is_side_state() {
        return true;
    }
    match (from.departure_rank(), to.rank()) {
        (Some(f), Some(t)) => t > f,
        _ => false,
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStatus {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::FORWARD
            .iter()
            .chain([ProcessStatus::Skipped, ProcessStatus::Populated].iter())
            .copied()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| PlanError::UnknownStatus(s.to_string()))
    }
}
