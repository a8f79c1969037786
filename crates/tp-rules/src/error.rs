// error.rs — Error types for path traversal and rule parsing.
//
// Neither type escapes rule evaluation: a failed path walk means "absent"
// and a malformed rule means "not passed". They exist so every failure has
// a name and a message that can be surfaced as a diagnostic.

use thiserror::Error;

/// Why a dot-path walk over a document failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path string was empty (or only whitespace).
    #[error("empty path")]
    EmptyPath,

    /// The path contained an empty segment, e.g. `flight..number`.
    #[error("empty segment in path '{path}'")]
    EmptySegment { path: String },

    /// No value exists at `segment`, or the value there is null.
    #[error("'{path}' not found (no value at segment '{segment}')")]
    NotFound { path: String, segment: String },

    /// `segment` tried to index into a string, number, or bool.
    #[error("'{path}': segment '{segment}' does not address an object or array")]
    NotAContainer { path: String, segment: String },
}

/// A rule that could not be understood.
///
/// `location` points into the rule tree (e.g. `all[2].for_each`), not into
/// the evaluated document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed rule at {location}: {reason}")]
pub struct MalformedRule {
    pub location: String,
    pub reason: String,
}

impl MalformedRule {
    pub(crate) fn new(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            reason: reason.into(),
        }
    }
}
