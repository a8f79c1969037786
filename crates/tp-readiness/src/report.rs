// report.rs — ReadinessReporter and the StatusReport it produces.
//
// Every rule block is evaluated against the document's rule root for the
// reported destination (global processes plus that destination's processes,
// keyed by process identifier), so rules address fields as
// `process_3_transportation.flight.number`.
//
// Milestones are scanned in their declared order and the scan stops at the
// first milestone that has not passed: with order [A, B, C] and results
// [pass, fail, pass], the current milestone is A and the next is B. C's pass
// does not count toward progress until B passes too.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tp_plan::{PlanDocument, PlanError, ProcessKey, ProcessStatus, SchemaContract};
use tp_rules::evaluate_rule_block;

use crate::rules::ReadinessRules;

/// Readiness of one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReport {
    pub name: String,
    pub status: ProcessStatus,
    pub dirty: bool,
    pub ready_to_proceed: bool,
    pub current_milestone: Option<String>,
    pub next_milestone: Option<String>,
    /// Every declared milestone and whether its block passed on its own.
    pub milestones: BTreeMap<String, bool>,
    pub missing_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    /// Fraction complete, 0.0 to 1.0.
    pub progress: f64,
}

/// Counts across the reported processes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub ready: usize,
    pub dirty: usize,
    /// Not ready to proceed and not skipped.
    pub blocked: usize,
}

/// The status report for one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// Weighted completion percentage, 0 to 100, one decimal.
    pub overall_readiness: f64,
    pub processes: Vec<ProcessReport>,
    pub summary: ReportSummary,
}

/// Where a process stands in its milestone order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneProgress {
    pub current: Option<String>,
    pub next: Option<String>,
    /// Milestones achieved contiguously from the start.
    pub achieved: usize,
    pub total: usize,
}

impl MilestoneProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.achieved as f64 / self.total as f64
        }
    }
}

/// Scan `order` from the start; the first milestone that did not pass ends
/// the scan. Milestones absent from `results` count as not passed.
pub fn milestone_progress(order: &[String], results: &BTreeMap<String, bool>) -> MilestoneProgress {
    let achieved = order
        .iter()
        .take_while(|name| results.get(name.as_str()).copied().unwrap_or(false))
        .count();
    MilestoneProgress {
        current: achieved.checked_sub(1).map(|i| order[i].clone()),
        next: order.get(achieved).cloned(),
        achieved,
        total: order.len(),
    }
}

/// Evaluates readiness rules against a plan document.
#[derive(Debug, Clone)]
pub struct ReadinessReporter {
    rules: ReadinessRules,
    schema: SchemaContract,
}

impl ReadinessReporter {
    pub fn new(rules: ReadinessRules, schema: SchemaContract) -> Self {
        Self { rules, schema }
    }

    pub fn rules(&self) -> &ReadinessRules {
        &self.rules
    }

    /// Build the report for `destination` (the active destination when
    /// `None`; only global processes when there is none).
    pub fn evaluate(
        &self,
        doc: &PlanDocument,
        destination: Option<&str>,
    ) -> Result<StatusReport, PlanError> {
        let destination = match destination {
            Some(d) if !doc.destinations.contains_key(d) => {
                return Err(PlanError::MissingDestination(d.to_string()));
            }
            Some(d) => Some(d.to_string()),
            None => doc.active_destination.clone(),
        };
        let root = doc.rule_root(destination.as_deref());

        let mut processes = Vec::new();
        for process in &self.schema.process_nodes {
            let key = if self.schema.is_global(process) {
                ProcessKey::global(process.clone())
            } else {
                match &destination {
                    Some(d) => ProcessKey::at(d.clone(), process.clone()),
                    None => continue,
                }
            };
            let Some(state) = doc.state(&key) else {
                tracing::debug!("{} has no state; not reported", key);
                continue;
            };
            processes.push(self.process_report(process, state.status, state.dirty, &root));
        }

        let summary = summarize(&processes);
        let overall_readiness = self.overall(&processes);
        Ok(StatusReport {
            project: doc.project.clone(),
            destination,
            generated_at: Utc::now(),
            overall_readiness,
            processes,
            summary,
        })
    }

    fn process_report(
        &self,
        process: &str,
        status: ProcessStatus,
        dirty: bool,
        root: &Value,
    ) -> ProcessReport {
        let rules = self.rules.for_process(process);
        let ready = evaluate_rule_block(rules.and_then(|r| r.ready_to_proceed.as_ref()), root);

        let order = self.rules.order(process);
        let mut milestones = BTreeMap::new();
        let mut diagnostics = ready.diagnostics;
        if let Some(r) = rules {
            for (name, block) in &r.milestones {
                milestones.insert(name.clone(), evaluate_rule_block(Some(block), root).passed);
            }
        }
        for name in order {
            if !milestones.contains_key(name) {
                diagnostics.push(format!("milestone '{name}' has no rule block"));
                milestones.insert(name.clone(), false);
            }
        }

        let progress = milestone_progress(order, &milestones);
        let fraction = if progress.total == 0 {
            if ready.passed {
                1.0
            } else {
                0.0
            }
        } else {
            progress.fraction()
        };

        ProcessReport {
            name: process.to_string(),
            status,
            dirty,
            ready_to_proceed: ready.passed,
            current_milestone: progress.current,
            next_milestone: progress.next,
            milestones,
            missing_fields: ready.missing,
            diagnostics,
            progress: fraction,
        }
    }

    /// Weighted average of process progress, as a percentage.
    fn overall(&self, processes: &[ProcessReport]) -> f64 {
        let (weighted, total_weight) =
            processes
                .iter()
                .fold((0.0, 0.0), |(weighted, total), report| {
                    let weight = self.rules.weight(&report.name);
                    (weighted + weight * report.progress, total + weight)
                });
        if total_weight <= 0.0 {
            return 0.0;
        }
        (weighted / total_weight * 1000.0).round() / 10.0
    }
}

fn summarize(processes: &[ProcessReport]) -> ReportSummary {
    let mut summary = ReportSummary {
        total: processes.len(),
        ..ReportSummary::default()
    };
    for p in processes {
        if p.ready_to_proceed {
            summary.ready += 1;
        } else if p.status != ProcessStatus::Skipped {
            summary.blocked += 1;
        }
        if p.dirty {
            summary.dirty += 1;
        }
    }
    summary
}

/// Plain-text rendering for terminals.
pub fn render_text(report: &StatusReport) -> String {
    report.to_string()
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project: {}", self.project)?;
        if let Some(d) = &self.destination {
            writeln!(f, "Destination: {d}")?;
        }
        writeln!(f, "Overall readiness: {:.1}%", self.overall_readiness)?;
        writeln!(f)?;

        let width = self
            .processes
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0);
        for p in &self.processes {
            let flag = if p.dirty { "*" } else { " " };
            let ready = if p.ready_to_proceed { "ready" } else { "blocked" };
            write!(
                f,
                "  {:<width$} {:<11}{} {:<8} {:>5.1}%",
                p.name,
                p.status.as_str(),
                flag,
                ready,
                p.progress * 100.0,
            )?;
            if let Some(current) = &p.current_milestone {
                write!(f, "  at {current}")?;
            }
            if let Some(next) = &p.next_milestone {
                write!(f, "  next {next}")?;
            }
            writeln!(f)?;
            for field in &p.missing_fields {
                writeln!(f, "      missing: {field}")?;
            }
            for diagnostic in &p.diagnostics {
                writeln!(f, "      note: {diagnostic}")?;
            }
        }

        let s = &self.summary;
        writeln!(f)?;
        writeln!(
            f,
            "{} processes: {} ready, {} blocked, {} dirty",
            s.total, s.ready, s.blocked, s.dirty
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tp_rules::{Rule, RuleBlock};

    const DATE: &str = "process_1_date_anchor";
    const TRANSPORT: &str = "process_3_transportation";
    const HOTEL: &str = "process_4_accommodation";

    fn schema() -> SchemaContract {
        SchemaContract::new(
            vec![DATE.into(), TRANSPORT.into(), HOTEL.into()],
            vec![DATE.into()],
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn present(path: &str) -> Value {
        RuleBlock::all(vec![Rule::present(path)]).to_value()
    }

    #[test]
    fn first_gap_stops_the_scan() {
        let order = names(&["A", "B", "C"]);
        let results = BTreeMap::from([
            ("A".to_string(), true),
            ("B".to_string(), false),
            ("C".to_string(), true),
        ]);
        let progress = milestone_progress(&order, &results);
        assert_eq!(progress.current.as_deref(), Some("A"));
        assert_eq!(progress.next.as_deref(), Some("B"));
        assert_eq!(progress.achieved, 1);
        assert!((progress.fraction() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn nothing_achieved_and_everything_achieved() {
        let order = names(&["A", "B"]);
        let none = milestone_progress(&order, &BTreeMap::new());
        assert_eq!(none.current, None);
        assert_eq!(none.next.as_deref(), Some("A"));

        let all = BTreeMap::from([("A".to_string(), true), ("B".to_string(), true)]);
        let done = milestone_progress(&order, &all);
        assert_eq!(done.current.as_deref(), Some("B"));
        assert_eq!(done.next, None);
        assert_eq!(done.fraction(), 1.0);
    }

    fn rules() -> ReadinessRules {
        let mut rules = ReadinessRules::default();
        let transport = rules.processes.entry(TRANSPORT.into()).or_default();
        transport.ready_to_proceed = Some(present("process_3_transportation.flight.number"));
        transport
            .milestones
            .insert("A".into(), present("process_3_transportation.options"));
        transport
            .milestones
            .insert("B".into(), present("process_3_transportation.flight"));
        transport
            .milestones
            .insert("C".into(), present("process_1_date_anchor.start"));
        rules
            .milestone_order
            .insert(TRANSPORT.into(), names(&["A", "B", "C"]));

        let date = rules.processes.entry(DATE.into()).or_default();
        date.ready_to_proceed = Some(present("process_1_date_anchor.start"));
        rules
    }

    fn document() -> PlanDocument {
        let s = schema();
        let mut doc = PlanDocument::new("japan-2026", &s);
        doc.add_destination("osaka", &s).unwrap();
        doc.add_destination("kyoto", &s).unwrap();
        doc
    }

    #[test]
    fn milestone_scenario_in_a_report() {
        let mut doc = document();
        doc.set_field(&ProcessKey::global(DATE), "start", json!("2026-11-03"))
            .unwrap();
        doc.set_field(
            &ProcessKey::at("osaka", TRANSPORT),
            "options",
            json!([{ "number": "IT200" }]),
        )
        .unwrap();

        let reporter = ReadinessReporter::new(rules(), schema());
        let report = reporter.evaluate(&doc, Some("osaka")).unwrap();
        let transport = report.processes.iter().find(|p| p.name == TRANSPORT).unwrap();

        assert_eq!(
            transport.milestones,
            BTreeMap::from([
                ("A".to_string(), true),
                ("B".to_string(), false),
                ("C".to_string(), true),
            ])
        );
        assert_eq!(transport.current_milestone.as_deref(), Some("A"));
        assert_eq!(transport.next_milestone.as_deref(), Some("B"));
        assert!(!transport.ready_to_proceed);
        assert_eq!(
            transport.missing_fields,
            vec!["process_3_transportation.flight.number"]
        );
        assert!(transport.dirty);
    }

    #[test]
    fn overall_readiness_is_weighted() {
        let mut doc = document();
        doc.set_field(&ProcessKey::global(DATE), "start", json!("2026-11-03"))
            .unwrap();
        doc.set_field(&ProcessKey::at("osaka", TRANSPORT), "options", json!([1]))
            .unwrap();

        let mut rules = rules();
        rules.processes.get_mut(TRANSPORT).unwrap().weight = 3.0;
        let report = ReadinessReporter::new(rules, schema())
            .evaluate(&doc, Some("osaka"))
            .unwrap();
        // date: ready, no milestones -> 1.0 (w 1); transport: 1/3 (w 3);
        // hotel: no rules -> 0.0 (w 1). (1 + 1 + 0) / 5 = 40%.
        assert_eq!(report.overall_readiness, 40.0);
        assert_eq!(
            report.summary,
            ReportSummary {
                total: 3,
                ready: 1,
                dirty: 2,
                blocked: 2,
            }
        );
    }

    #[test]
    fn report_defaults_to_active_destination() {
        let doc = document();
        let report = ReadinessReporter::new(rules(), schema())
            .evaluate(&doc, None)
            .unwrap();
        assert_eq!(report.destination.as_deref(), Some("osaka"));
        assert_eq!(report.processes.len(), 3);
        assert_eq!(report.processes[0].name, DATE);
    }

    #[test]
    fn only_globals_without_destinations() {
        let doc = PlanDocument::new("japan-2026", &schema());
        let report = ReadinessReporter::new(rules(), schema())
            .evaluate(&doc, None)
            .unwrap();
        assert_eq!(report.destination, None);
        assert_eq!(report.processes.len(), 1);
    }

    #[test]
    fn unknown_destination_is_an_error() {
        let doc = document();
        let result = ReadinessReporter::new(rules(), schema()).evaluate(&doc, Some("tokyo"));
        assert!(matches!(result, Err(PlanError::MissingDestination(_))));
    }

    #[test]
    fn malformed_ready_block_fails_closed_with_diagnostic() {
        let doc = document();
        let mut rules = ReadinessRules::default();
        rules.processes.entry(HOTEL.into()).or_default().ready_to_proceed = Some(json!({ "all": [] }));
        rules
            .milestone_order
            .insert(HOTEL.into(), names(&["booked"]));
        let report = ReadinessReporter::new(rules, schema())
            .evaluate(&doc, Some("kyoto"))
            .unwrap();
        let hotel = report.processes.iter().find(|p| p.name == HOTEL).unwrap();
        assert!(!hotel.ready_to_proceed);
        assert!(!hotel.diagnostics.is_empty());
        assert!(hotel
            .diagnostics
            .iter()
            .any(|d| d.contains("'booked' has no rule block")));
        assert_eq!(hotel.next_milestone.as_deref(), Some("booked"));
    }

    #[test]
    fn skipped_processes_are_not_blocked() {
        let mut doc = document();
        doc.set_process_status(&ProcessKey::at("osaka", HOTEL), ProcessStatus::Skipped, None)
            .unwrap();
        let report = ReadinessReporter::new(rules(), schema())
            .evaluate(&doc, Some("osaka"))
            .unwrap();
        assert_eq!(report.summary.blocked, 2);
    }

    #[test]
    fn report_json_uses_camel_case() {
        let doc = document();
        let report = ReadinessReporter::new(rules(), schema())
            .evaluate(&doc, Some("osaka"))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("overallReadiness").is_some());
        assert!(json.get("generatedAt").is_some());
        assert!(json["processes"][0].get("readyToProceed").is_some());
        assert!(json["processes"][0].get("missingFields").is_some());
    }

    #[test]
    fn text_rendering_lists_processes_and_summary() {
        let mut doc = document();
        doc.set_field(&ProcessKey::global(DATE), "start", json!("2026-11-03"))
            .unwrap();
        let report = ReadinessReporter::new(rules(), schema())
            .evaluate(&doc, Some("osaka"))
            .unwrap();
        let text = render_text(&report);
        assert!(text.starts_with("Project: japan-2026\nDestination: osaka\n"));
        assert!(text.contains("process_1_date_anchor"));
        assert!(text.contains("missing: process_3_transportation.flight.number"));
        assert!(text.contains("next A"));
        assert!(text.trim_end().ends_with("3 processes: 1 ready, 2 blocked, 1 dirty"));
    }

    #[test]
    fn display_matches_text_rendering() {
        let mut report = ReadinessReporter::new(rules(), schema())
            .evaluate(&document(), Some("kyoto"))
            .unwrap();
        assert_eq!(format!("{report}"), render_text(&report));
        assert!(report.to_string().contains("Destination: kyoto\n"));

        report.destination = None;
        assert!(!report.to_string().contains("Destination:"));
    }
}
