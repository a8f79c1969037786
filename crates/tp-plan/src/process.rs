// process.rs — Per-process state and the key that addresses it.
//
// A ProcessState carries the lifecycle status, the dirty flag, and the
// process's own data fields (the JSON subtree rules read and populate
// actions write into).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PlanError;
use crate::status::ProcessStatus;

/// Addresses one ProcessState: a per-destination copy, or the single
/// global instance when `destination` is `None`.
///
/// Ordering is by destination (global first) then process identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub process: String,
}

impl ProcessKey {
    pub fn global(process: impl Into<String>) -> Self {
        Self {
            destination: None,
            process: process.into(),
        }
    }

    pub fn at(destination: impl Into<String>, process: impl Into<String>) -> Self {
        Self {
            destination: Some(destination.into()),
            process: process.into(),
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.destination {
            Some(destination) => write!(f, "{}/{}", destination, self.process),
            None => write!(f, "global/{}", self.process),
        }
    }
}

/// The state of one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessState {
    pub status: ProcessStatus,

    /// Upstream inputs changed and downstream effects have not been recomputed.
    #[serde(default)]
    pub dirty: bool,

    /// Why the process was last marked dirty or changed status.
    #[serde(default)]
    pub reason: Option<String>,

    pub updated_at: DateTime<Utc>,

    /// The process's own fields (chosen offers, dates, notes, ...).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ProcessState {
    /// A fresh state: pending, clean, no data.
    pub fn new() -> Self {
        Self {
            status: ProcessStatus::Pending,
            dirty: false,
            reason: None,
            updated_at: Utc::now(),
            data: Value::Null,
        }
    }

    pub fn mark_dirty(&mut self, reason: Option<String>) {
        self.dirty = true;
        if reason.is_some() {
            self.reason = reason;
        }
    }

    /// Clear the dirty flag. Returns whether it was set.
    pub fn clear_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Force the process back to pending (cascade reset).
    ///
    /// `stay_dirty` keeps the flag set so that the process's own dependents
    /// are cascaded in a following round.
    pub fn reset(&mut self, reason: impl Into<String>, stay_dirty: bool, at: DateTime<Utc>) {
        self.status = ProcessStatus::Pending;
        self.dirty = stay_dirty;
        self.reason = Some(reason.into());
        self.updated_at = at;
    }

    /// Copy `fields` (a flat object of `field.path → value`) into this
    /// process's data and mark it populated.
    ///
    /// Nothing is written unless every path can be assigned.
    pub fn populate(
        &mut self,
        fields: &Value,
        reason: impl Into<String>,
        stay_dirty: bool,
        at: DateTime<Utc>,
    ) -> Result<(), PlanError> {
        let mut data = self.data.clone();
        if let Value::Object(map) = fields {
            for (path, value) in map {
                tp_rules::path::assign(&mut data, path, value.clone())?;
            }
        }
        self.data = data;
        self.status = ProcessStatus::Populated;
        self.dirty = stay_dirty;
        self.reason = Some(reason.into());
        self.updated_at = at;
        Ok(())
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}
