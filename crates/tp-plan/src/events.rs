// events.rs — Plan events and the append-only event log.
//
// Every mutation of the plan document produces a PlanEvent describing what
// happened. Events are appended to a JSONL file (one JSON object per line)
// and never rewritten; the file is the audit trail that external readers
// (dashboards, agents) tail.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PlanError;
use crate::process::ProcessKey;

/// What kind of mutation an event records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DestinationCreated,
    DestinationRemoved,
    StatusChanged,
    MarkedDirty,
    FieldUpdated,
    ProcessReset,
    ProcessPopulated,
    CascadeApplied,
}

/// One line in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEvent {
    pub at: DateTime<Utc>,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl PlanEvent {
    pub fn new(event: EventKind) -> Self {
        Self {
            at: Utc::now(),
            event,
            destination: None,
            process: None,
            data: None,
        }
    }

    /// Attach the (destination, process) the event is about.
    pub fn for_key(mut self, key: &ProcessKey) -> Self {
        self.destination = key.destination.clone();
        self.process = Some(key.process.clone());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}

/// An append-only JSONL event log.
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append events in order. Creates the file (and parent directory) on
    /// first use.
    pub fn append(&self, events: &[PlanEvent]) -> Result<(), PlanError> {
        if events.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(parent, source))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(&self.path, source))?;

        let mut buf = String::new();
        for event in events {
            buf.push_str(&serde_json::to_string(event)?);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes())
            .map_err(|source| self.io_error(&self.path, source))?;
        Ok(())
    }

    /// Read every event, oldest first. A missing log reads as empty.
    pub fn read_all(&self) -> Result<Vec<PlanEvent>, PlanError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(|source| self.io_error(&self.path, source))?;
        let mut events: Vec<PlanEvent> = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| self.io_error(&self.path, source))?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }

    /// The last `n` events, oldest first.
    pub fn tail(&self, n: usize) -> Result<Vec<PlanEvent>, PlanError> {
        let mut events = self.read_all()?;
        let skip = events.len().saturating_sub(n);
        Ok(events.split_off(skip))
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PlanError {
        PlanError::IoError {
            path: path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn event_serializes_without_empty_fields() {
        let event = PlanEvent::new(EventKind::CascadeApplied);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "cascade_applied");
        assert!(json.get("destination").is_none());
        assert!(json.get("process").is_none());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn event_for_key_carries_destination_and_process() {
        let key = ProcessKey::at("osaka", "process_3_transportation");
        let event = PlanEvent::new(EventKind::ProcessReset)
            .for_key(&key)
            .with_data(json!({ "reason": "dates changed" }));
        assert_eq!(event.destination.as_deref(), Some("osaka"));
        assert_eq!(event.process.as_deref(), Some("process_3_transportation"));
    }

    #[test]
    fn log_appends_and_reads_back_in_order() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("nested/events.jsonl"));

        log.append(&[PlanEvent::new(EventKind::DestinationCreated).with_destination("osaka")])
            .unwrap();
        log.append(&[
            PlanEvent::new(EventKind::MarkedDirty),
            PlanEvent::new(EventKind::CascadeApplied),
        ])
        .unwrap();

        let events = log.read_all().unwrap();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.event).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::DestinationCreated,
                EventKind::MarkedDirty,
                EventKind::CascadeApplied
            ]
        );
        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
        log.append(&[]).unwrap();
        assert!(!log.path().exists());
    }

    #[test]
    fn tail_returns_last_events() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.jsonl"));
        let events: Vec<PlanEvent> = ["a", "b", "c"]
            .iter()
            .map(|d| PlanEvent::new(EventKind::DestinationCreated).with_destination(*d))
            .collect();
        log.append(&events).unwrap();

        let tail = log.tail(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].destination.as_deref(), Some("b"));
        assert_eq!(log.tail(10).unwrap().len(), 3);
    }
}
