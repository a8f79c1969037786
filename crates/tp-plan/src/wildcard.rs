// wildcard.rs — Prefix wildcard expansion against the schema's process list.
//
// A pattern without `*` is returned as-is, even when it is not a known
// process; callers run `validate_targets` to catch those. A pattern with
// `*` keeps everything before the first `*` as a prefix and matches every
// known process that starts with it.
//
// Examples (nodes = process_3_transportation, process_3_4_packages,
//           process_4_accommodation):
//   "process_3_*"     → [process_3_4_packages, process_3_transportation]
//   "process_9_*"     → []
//   "process_7_typo"  → [process_7_typo]   (pass-through)

use std::collections::BTreeSet;

/// Expand one pattern against `nodes`. Output is sorted and deduplicated.
pub fn expand_wildcard(pattern: &str, nodes: &[String]) -> Vec<String> {
    let Some(prefix) = wildcard_prefix(pattern) else {
        return vec![pattern.to_string()];
    };
    nodes
        .iter()
        .filter(|node| node.starts_with(prefix))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Union of `expand_wildcard` over every pattern, sorted and deduplicated.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S], nodes: &[String]) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|pattern| expand_wildcard(pattern.as_ref(), nodes))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The subset of `targets` that is not a known process (empty = all valid).
pub fn validate_targets(targets: &[String], nodes: &[String]) -> Vec<String> {
    targets
        .iter()
        .filter(|target| !nodes.contains(*target))
        .cloned()
        .collect()
}

/// Whether `process` is addressed by `pattern`.
///
/// Same rule as expansion: prefix match for wildcard patterns, equality for
/// literals.
pub fn matches(pattern: &str, process: &str) -> bool {
    match wildcard_prefix(pattern) {
        Some(prefix) => process.starts_with(prefix),
        None => pattern == process,
    }
}

fn wildcard_prefix(pattern: &str) -> Option<&str> {
    pattern.find('*').map(|star| &pattern[..star])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> Vec<String> {
        [
            "process_1_date_anchor",
            "process_4_accommodation",
            "process_3_transportation",
            "process_5_daily_itinerary",
            "process_3_4_packages",
            "process_2_destination",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn literal_pattern_passes_through() {
        assert_eq!(
            expand_wildcard("process_1_date_anchor", &nodes()),
            vec!["process_1_date_anchor"]
        );
        assert_eq!(expand_wildcard("process_7_typo", &nodes()), vec!["process_7_typo"]);
    }

    #[test]
    fn wildcard_expands_sorted() {
        assert_eq!(
            expand_wildcard("process_3_*", &nodes()),
            vec!["process_3_4_packages", "process_3_transportation"]
        );
    }

    #[test]
    fn expansion_ignores_declaration_order() {
        let mut reversed = nodes();
        reversed.reverse();
        assert_eq!(
            expand_wildcard("process_*", &nodes()),
            expand_wildcard("process_*", &reversed)
        );
    }

    #[test]
    fn wildcard_with_no_match_is_empty() {
        assert!(expand_wildcard("process_9_*", &nodes()).is_empty());
    }

    #[test]
    fn bare_star_matches_everything() {
        assert_eq!(expand_wildcard("*", &nodes()).len(), nodes().len());
    }

    #[test]
    fn text_after_star_is_ignored() {
        assert_eq!(
            expand_wildcard("process_3_*_ignored", &nodes()),
            expand_wildcard("process_3_*", &nodes())
        );
    }

    #[test]
    fn expand_patterns_is_order_independent() {
        let a = expand_patterns(&["process_3_*", "process_4_*"], &nodes());
        let b = expand_patterns(&["process_4_*", "process_3_*"], &nodes());
        assert_eq!(a, b);
        assert_eq!(
            a,
            vec![
                "process_3_4_packages",
                "process_3_transportation",
                "process_4_accommodation"
            ]
        );
    }

    #[test]
    fn expand_patterns_deduplicates_overlaps() {
        let out = expand_patterns(&["process_3_*", "process_3_transportation"], &nodes());
        assert_eq!(out, vec!["process_3_4_packages", "process_3_transportation"]);
    }

    #[test]
    fn validate_targets_reports_unknown() {
        let targets = vec![
            "process_3_transportation".to_string(),
            "process_7_typo".to_string(),
        ];
        assert_eq!(validate_targets(&targets, &nodes()), vec!["process_7_typo"]);
        assert!(validate_targets(&targets[..1], &nodes()).is_empty());
    }

    #[test]
    fn matches_uses_prefix_or_equality() {
        assert!(matches("process_3_*", "process_3_4_packages"));
        assert!(!matches("process_3_*", "process_4_accommodation"));
        assert!(matches("process_1_date_anchor", "process_1_date_anchor"));
        assert!(!matches("process_1_date", "process_1_date_anchor"));
    }
}
