// error.rs — Error types for the plan document subsystem.

use thiserror::Error;
use tp_rules::PathError;

use crate::status::ProcessStatus;

/// Errors that can occur while reading or mutating a plan document.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize JSON.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Failed to parse a YAML table.
    #[error("YAML error in {path}: {source}")]
    YamlError {
        path: String,
        source: serde_yaml::Error,
    },

    /// The requested status change is not allowed by the lifecycle.
    #[error("invalid transition from {from} to {to} for {key}")]
    InvalidTransition {
        key: String,
        from: ProcessStatus,
        to: ProcessStatus,
    },

    /// The process identifier is not part of the document.
    #[error("unknown process: {0}")]
    UnknownProcess(String),

    /// A status name that is not part of the lifecycle.
    #[error("unknown status: {0}")]
    UnknownStatus(String),

    /// The destination does not exist in the document.
    #[error("destination not found: {0}")]
    MissingDestination(String),

    /// A per-destination process was addressed without a destination and
    /// the document has no active destination.
    #[error("{0} is per-destination and no destination is active")]
    NoActiveDestination(String),

    /// A destination with this name already exists.
    #[error("destination already exists: {0}")]
    DuplicateDestination(String),

    /// A field path could not be written.
    #[error("field path error: {0}")]
    Path(#[from] PathError),

    /// The stored document changed since it was loaded.
    #[error("version conflict: expected stored version {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    /// A document already exists where a new one was to be created.
    #[error("document already exists at {0}")]
    AlreadyExists(String),
}
