// document.rs — PlanDocument: every destination and every process state.
//
// The whole document is loaded, mutated by one command, and saved as a
// unit. Each mutating operation bumps `version`, which the store uses for
// its compare-and-swap check and cascade plans use to detect staleness.
//
// Process states are created pending and clean when their destination is
// created (global ones when the document is created) and only disappear
// with their destination.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::PlanError;
use crate::events::{EventKind, PlanEvent};
use crate::process::{ProcessKey, ProcessState};
use crate::schema::SchemaContract;
use crate::status::{is_valid_transition, ProcessStatus, TransitionCause};

/// One named branch of the plan (a trip leg) with its own process copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processes: BTreeMap<String, ProcessState>,
}

/// The in-memory plan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub project: String,

    /// Bumped by every mutation that changes the document.
    #[serde(default)]
    pub version: u64,

    /// Destination used when a per-destination process is addressed
    /// without naming one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_destination: Option<String>,

    /// Destination-independent processes.
    #[serde(default)]
    pub global: BTreeMap<String, ProcessState>,

    #[serde(default)]
    pub destinations: BTreeMap<String, Destination>,

    /// When the last cascade plan was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cascade_run: Option<DateTime<Utc>>,
}

impl PlanDocument {
    /// Create a document with a pending state for each global process.
    pub fn new(project: impl Into<String>, schema: &SchemaContract) -> Self {
        Self {
            project: project.into(),
            version: 0,
            active_destination: None,
            global: schema
                .global_nodes
                .iter()
                .map(|node| (node.clone(), ProcessState::new()))
                .collect(),
            destinations: BTreeMap::new(),
            last_cascade_run: None,
        }
    }

    /// Record that the document changed.
    pub fn touch(&mut self) {
        self.version += 1;
    }

    /// Create a destination with a pending state for every per-destination
    /// process. The first destination becomes the active one.
    pub fn add_destination(
        &mut self,
        name: &str,
        schema: &SchemaContract,
    ) -> Result<PlanEvent, PlanError> {
        if self.destinations.contains_key(name) {
            return Err(PlanError::DuplicateDestination(name.to_string()));
        }
        let processes = schema
            .destination_nodes()
            .map(|node| (node.to_string(), ProcessState::new()))
            .collect();
        self.destinations.insert(
            name.to_string(),
            Destination {
                created_at: Utc::now(),
                processes,
            },
        );
        if self.active_destination.is_none() {
            self.active_destination = Some(name.to_string());
        }
        self.touch();
        tracing::debug!("destination created: {}", name);
        Ok(PlanEvent::new(EventKind::DestinationCreated).with_destination(name))
    }

    /// Remove a destination and all of its process states.
    pub fn remove_destination(&mut self, name: &str) -> Result<PlanEvent, PlanError> {
        if self.destinations.remove(name).is_none() {
            return Err(PlanError::MissingDestination(name.to_string()));
        }
        if self.active_destination.as_deref() == Some(name) {
            self.active_destination = self.destinations.keys().next().cloned();
        }
        self.touch();
        Ok(PlanEvent::new(EventKind::DestinationRemoved).with_destination(name))
    }

    pub fn set_active_destination(&mut self, name: &str) -> Result<(), PlanError> {
        if !self.destinations.contains_key(name) {
            return Err(PlanError::MissingDestination(name.to_string()));
        }
        if self.active_destination.as_deref() != Some(name) {
            self.active_destination = Some(name.to_string());
            self.touch();
        }
        Ok(())
    }

    /// Work out which state a (destination, process) request refers to.
    ///
    /// Global processes ignore the destination. Per-destination processes
    /// use the given destination, falling back to the active one.
    pub fn resolve_key(
        &self,
        destination: Option<&str>,
        process: &str,
    ) -> Result<ProcessKey, PlanError> {
        if self.global.contains_key(process) {
            return Ok(ProcessKey::global(process));
        }
        let destination = match destination {
            Some(d) => d.to_string(),
            None => self
                .active_destination
                .clone()
                .ok_or_else(|| PlanError::NoActiveDestination(process.to_string()))?,
        };
        let dest = self
            .destinations
            .get(&destination)
            .ok_or_else(|| PlanError::MissingDestination(destination.clone()))?;
        if !dest.processes.contains_key(process) {
            return Err(PlanError::UnknownProcess(process.to_string()));
        }
        Ok(ProcessKey::at(destination, process))
    }

    pub fn state(&self, key: &ProcessKey) -> Option<&ProcessState> {
        match &key.destination {
            None => self.global.get(&key.process),
            Some(d) => self.destinations.get(d)?.processes.get(&key.process),
        }
    }

    pub fn state_mut(&mut self, key: &ProcessKey) -> Result<&mut ProcessState, PlanError> {
        let states = match &key.destination {
            None => &mut self.global,
            Some(d) => {
                &mut self
                    .destinations
                    .get_mut(d)
                    .ok_or_else(|| PlanError::MissingDestination(d.clone()))?
                    .processes
            }
        };
        states
            .get_mut(&key.process)
            .ok_or_else(|| PlanError::UnknownProcess(key.to_string()))
    }

    /// Like `state_mut`, but creates a pending state when the destination
    /// exists and the process does not (documents written before a schema
    /// gained a node). Callers check the process against the schema first.
    pub fn state_entry(&mut self, key: &ProcessKey) -> Result<&mut ProcessState, PlanError> {
        let states = match &key.destination {
            None => &mut self.global,
            Some(d) => {
                &mut self
                    .destinations
                    .get_mut(d)
                    .ok_or_else(|| PlanError::MissingDestination(d.clone()))?
                    .processes
            }
        };
        Ok(states.entry(key.process.clone()).or_default())
    }

    /// Every process state with its key: globals first, then destinations
    /// by name, processes by identifier.
    pub fn states(&self) -> Vec<(ProcessKey, &ProcessState)> {
        let globals = self
            .global
            .iter()
            .map(|(process, state)| (ProcessKey::global(process.clone()), state));
        let per_destination = self.destinations.iter().flat_map(|(name, dest)| {
            dest.processes
                .iter()
                .map(move |(process, state)| (ProcessKey::at(name.clone(), process.clone()), state))
        });
        globals.chain(per_destination).collect()
    }

    /// Every dirty (destination, process) pair, in key order.
    pub fn dirty_keys(&self) -> Vec<ProcessKey> {
        self.states()
            .into_iter()
            .filter(|(_, state)| state.dirty)
            .map(|(key, _)| key)
            .collect()
    }

    /// Change a process's status through the lifecycle rules.
    ///
    /// Rejects anything the state machine does not allow; the document is
    /// not modified on error.
    pub fn set_process_status(
        &mut self,
        key: &ProcessKey,
        to: ProcessStatus,
        reason: Option<String>,
    ) -> Result<PlanEvent, PlanError> {
        let state = self.state_mut(key)?;
        let from = state.status;
        if !is_valid_transition(from, to, TransitionCause::Direct) {
            return Err(PlanError::InvalidTransition {
                key: key.to_string(),
                from,
                to,
            });
        }
        state.status = to;
        state.updated_at = Utc::now();
        if reason.is_some() {
            state.reason = reason.clone();
        }
        self.touch();
        tracing::debug!("{}: {} -> {}", key, from, to);
        Ok(PlanEvent::new(EventKind::StatusChanged)
            .for_key(key)
            .with_data(json!({ "from": from, "to": to, "reason": reason })))
    }

    /// Mark a process as stale so the next cascade run picks it up.
    pub fn mark_dirty(
        &mut self,
        key: &ProcessKey,
        reason: Option<String>,
    ) -> Result<PlanEvent, PlanError> {
        let state = self.state_mut(key)?;
        state.mark_dirty(reason.clone());
        self.touch();
        Ok(PlanEvent::new(EventKind::MarkedDirty)
            .for_key(key)
            .with_data(json!({ "reason": reason })))
    }

    /// Clear a dirty flag by hand. Returns whether it was set.
    pub fn clear_dirty(&mut self, key: &ProcessKey) -> Result<bool, PlanError> {
        let was_dirty = self.state_mut(key)?.clear_dirty();
        if was_dirty {
            self.touch();
        }
        Ok(was_dirty)
    }

    /// Write a field into a process's data and mark the process dirty.
    ///
    /// This is the upstream mutation that starts a cascade.
    pub fn set_field(
        &mut self,
        key: &ProcessKey,
        path: &str,
        value: Value,
    ) -> Result<PlanEvent, PlanError> {
        let state = self.state_mut(key)?;
        let mut data = state.data.clone();
        tp_rules::path::assign(&mut data, path, value.clone())?;
        state.data = data;
        state.updated_at = Utc::now();
        state.mark_dirty(Some(format!("{path} changed")));
        self.touch();
        Ok(PlanEvent::new(EventKind::FieldUpdated)
            .for_key(key)
            .with_data(json!({ "path": path, "value": value })))
    }

    /// The evaluation root for readiness rules at `destination`.
    ///
    /// Shape: `{ "project", "destination", "<process_id>": { ...data,
    /// "status", "dirty" } }` for every global process and every process of
    /// the destination.
    pub fn rule_root(&self, destination: Option<&str>) -> Value {
        let mut root = Map::new();
        root.insert("project".into(), Value::String(self.project.clone()));
        if let Some(d) = destination {
            root.insert("destination".into(), Value::String(d.to_string()));
        }
        for (process, state) in &self.global {
            root.insert(process.clone(), process_view(state));
        }
        if let Some(dest) = destination.and_then(|d| self.destinations.get(d)) {
            for (process, state) in &dest.processes {
                root.insert(process.clone(), process_view(state));
            }
        }
        Value::Object(root)
    }
}

fn process_view(state: &ProcessState) -> Value {
    let mut view = match &state.data {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other.clone());
            map
        }
    };
    view.insert("status".into(), Value::String(state.status.to_string()));
    view.insert("dirty".into(), Value::Bool(state.dirty));
    Value::Object(view)
}
