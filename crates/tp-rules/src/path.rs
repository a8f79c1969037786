// path.rs — Typed dot-path traversal over JSON document trees.
//
// A path is a dot-separated list of segments ("flight.outbound.code").
// Each segment indexes into the current value: an object key, or a
// numeric index when the current value is an array. Every step either
// lands on a value or fails with a PathError naming the segment.
//
// `null` is never "present": the walk stops the moment it meets one,
// including at the final segment.

use serde_json::{Map, Value};

use crate::error::PathError;

/// Split a path into its segments, rejecting empty paths and empty segments.
pub fn segments(path: &str) -> Result<Vec<&str>, PathError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyPath);
    }
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.iter().any(|segment| segment.is_empty()) {
        return Err(PathError::EmptySegment {
            path: path.to_string(),
        });
    }
    Ok(parts)
}

/// Resolve `path` against `root`.
///
/// Returns `NotFound` for a missing key, an out-of-range index, or a null
/// anywhere along the way; `NotAContainer` when a segment tries to index
/// into a scalar.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Result<&'a Value, PathError> {
    let mut current = root;
    for segment in segments(path)? {
        current = step(current, segment, path)?;
        if current.is_null() {
            return Err(not_found(path, segment));
        }
    }
    Ok(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Missing or null intermediates become empty objects. Array elements can be
/// overwritten by index but arrays are never grown.
pub fn assign(root: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let parts = segments(path)?;
    let Some((last, parents)) = parts.split_last() else {
        return Err(PathError::EmptyPath);
    };

    let mut current = root;
    for segment in parents {
        current = child_mut(current, segment, path)?;
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = last
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| not_found(path, last))?;
            *slot = value;
            Ok(())
        }
        _ => Err(not_a_container(path, last)),
    }
}

/// Whether a resolved value counts as "present": non-null, and for strings,
/// non-empty after trimming.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn step<'a>(current: &'a Value, segment: &str, path: &str) -> Result<&'a Value, PathError> {
    match current {
        Value::Object(map) => map.get(segment).ok_or_else(|| not_found(path, segment)),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .ok_or_else(|| not_found(path, segment)),
        Value::Null => Err(not_found(path, segment)),
        _ => Err(not_a_container(path, segment)),
    }
}

fn child_mut<'a>(
    current: &'a mut Value,
    segment: &str,
    path: &str,
) -> Result<&'a mut Value, PathError> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get_mut(index))
            .ok_or_else(|| not_found(path, segment)),
        _ => Err(not_a_container(path, segment)),
    }
}

fn not_found(path: &str, segment: &str) -> PathError {
    PathError::NotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

fn not_a_container(path: &str, segment: &str) -> PathError {
    PathError::NotAContainer {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}
