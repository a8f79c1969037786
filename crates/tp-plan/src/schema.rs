// schema.rs — SchemaContract: the authoritative list of process identifiers.
//
// No other component may invent identifiers. Wildcard expansion, target
// validation, and destination creation all read from here.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::loader;
use crate::wildcard;

/// The ordered set of valid process identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaContract {
    /// Every valid process identifier, in pipeline order.
    pub process_nodes: Vec<String>,

    /// The destination-independent subset of `process_nodes` (one global
    /// instance each). Everything else is copied per destination.
    #[serde(default)]
    pub global_nodes: Vec<String>,
}

impl SchemaContract {
    pub fn new(process_nodes: Vec<String>, global_nodes: Vec<String>) -> Self {
        Self {
            process_nodes,
            global_nodes,
        }
    }

    /// Load from a JSON or YAML file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        loader::load_table(path)
    }

    pub fn contains(&self, process: &str) -> bool {
        self.process_nodes.iter().any(|node| node == process)
    }

    pub fn is_global(&self, process: &str) -> bool {
        self.global_nodes.iter().any(|node| node == process)
    }

    /// Per-destination processes, in pipeline order.
    pub fn destination_nodes(&self) -> impl Iterator<Item = &str> {
        self.process_nodes
            .iter()
            .filter(|node| !self.is_global(node))
            .map(String::as_str)
    }

    /// Expand target patterns against this schema.
    pub fn expand(&self, patterns: &[String]) -> Vec<String> {
        wildcard::expand_patterns(patterns, &self.process_nodes)
    }

    /// Problems with the contract itself: duplicate identifiers and global
    /// nodes that are not process nodes. Empty means consistent.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = BTreeSet::new();
        for node in &self.process_nodes {
            if !seen.insert(node.as_str()) {
                issues.push(format!("duplicate process node: {node}"));
            }
            if node.contains('*') {
                issues.push(format!("process node contains a wildcard: {node}"));
            }
        }
        for global in &self.global_nodes {
            if !self.contains(global) {
                issues.push(format!("global node is not a process node: {global}"));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaContract {
        SchemaContract::new(
            vec![
                "process_1_date_anchor".into(),
                "process_2_destination".into(),
                "process_3_transportation".into(),
            ],
            vec!["process_1_date_anchor".into()],
        )
    }

    #[test]
    fn destination_nodes_exclude_globals() {
        let s = schema();
        let nodes: Vec<&str> = s.destination_nodes().collect();
        assert_eq!(nodes, vec!["process_2_destination", "process_3_transportation"]);
        assert!(s.is_global("process_1_date_anchor"));
        assert!(!s.is_global("process_2_destination"));
    }

    #[test]
    fn valid_schema_has_no_issues() {
        assert!(schema().validate().is_empty());
    }

    #[test]
    fn validate_reports_duplicates_and_stray_globals() {
        let mut s = schema();
        s.process_nodes.push("process_2_destination".into());
        s.global_nodes.push("process_0_weather".into());
        let issues = s.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("duplicate"));
        assert!(issues[1].contains("process_0_weather"));
    }

    #[test]
    fn global_nodes_default_to_empty() {
        let s: SchemaContract =
            serde_json::from_str(r#"{ "process_nodes": ["a", "b"] }"#).unwrap();
        assert!(s.global_nodes.is_empty());
        assert_eq!(s.destination_nodes().count(), 2);
    }
}
