// loader.rs — Load declarative tables (schema, triggers, readiness rules).
//
// Tables are authored in JSON or YAML; the file extension decides which
// parser is used (`.yaml` / `.yml` → YAML, anything else → JSON).

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::PlanError;

/// Read and parse a table from `path`.
pub fn load_table<T: DeserializeOwned>(path: &Path) -> Result<T, PlanError> {
    let content = fs::read_to_string(path).map_err(|source| PlanError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    parse_table(&content, path)
}

/// Parse table text, choosing the format from `path`'s extension.
pub fn parse_table<T: DeserializeOwned>(content: &str, path: &Path) -> Result<T, PlanError> {
    if is_yaml(path) {
        serde_yaml::from_str(content).map_err(|source| PlanError::YamlError {
            path: path.display().to_string(),
            source,
        })
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}
