//! End-to-end cascade over a persisted plan document with YAML trigger rules.

use std::fs;

use serde_json::json;
use tempfile::tempdir;
use tp_cascade::{CascadeEngine, CascadeError, PlanWarning, TriggerTable};
use tp_plan::{DocumentStore, EventKind, EventLog, PlanDocument, ProcessKey, ProcessStatus, SchemaContract};

const SCHEMA: &str = r#"{
  "process_nodes": [
    "process_1_date_anchor",
    "process_2_destination",
    "process_3_4_packages",
    "process_3_transportation",
    "process_4_accommodation",
    "process_5_daily_itinerary"
  ],
  "global_nodes": ["process_1_date_anchor"]
}"#;

const TRIGGERS: &str = r#"
triggers:
  - source_pattern: process_1_date_anchor
    scope: global
    targets: ["process_3_*", "process_4_*", "process_5_*"]
    action: reset
  - source_pattern: process_2_destination
    scope: current_destination
    targets: ["process_3_*", "process_4_*", process_6_budget]
    action: reset
  - source_pattern: process_3_4_packages
    scope: current_destination
    targets: [process_3_transportation, process_4_accommodation]
    action: populate
    populate_spec:
      source: chosen_offer
      fields:
        - { target: process_3_transportation, from: flight, to: flight }
        - { target: process_4_accommodation, from: hotel, to: hotel }
"#;

fn setup() -> (tempfile::TempDir, SchemaContract, CascadeEngine) {
    let dir = tempdir().unwrap();
    let schema_path = dir.path().join("schema.json");
    let triggers_path = dir.path().join("triggers.yaml");
    fs::write(&schema_path, SCHEMA).unwrap();
    fs::write(&triggers_path, TRIGGERS).unwrap();

    let schema = SchemaContract::load(&schema_path).unwrap();
    let table = TriggerTable::load(&triggers_path).unwrap();
    let engine = CascadeEngine::try_new(table, schema.clone()).unwrap();
    (dir, schema, engine)
}

#[test]
fn date_change_reopens_every_leg_and_is_persisted() {
    let (dir, schema, engine) = setup();
    let store = DocumentStore::new(dir.path().join("plan.json"));
    let log = EventLog::new(dir.path().join("events.jsonl"));

    let mut doc = PlanDocument::new("japan-2026", &schema);
    doc.add_destination("osaka", &schema).unwrap();
    doc.add_destination("kyoto", &schema).unwrap();
    for d in ["osaka", "kyoto"] {
        doc.set_process_status(
            &ProcessKey::at(d, "process_4_accommodation"),
            ProcessStatus::Booked,
            None,
        )
        .unwrap();
    }
    store.create(&doc).unwrap();

    let mut doc = store.load().unwrap();
    let base = doc.version;
    let event = doc
        .set_field(
            &ProcessKey::global("process_1_date_anchor"),
            "start",
            json!("2026-11-05"),
        )
        .unwrap();

    let run = engine.run_to_fixpoint(&mut doc, 8).unwrap();
    assert_eq!(run.rounds(), 1);
    assert_eq!(run.action_count(), 8);

    store.save(&doc, base).unwrap();
    log.append(&[event]).unwrap();
    log.append(&run.events).unwrap();

    let reloaded = store.load().unwrap();
    for d in ["osaka", "kyoto"] {
        let hotel = reloaded
            .state(&ProcessKey::at(d, "process_4_accommodation"))
            .unwrap();
        assert_eq!(hotel.status, ProcessStatus::Pending);
    }
    assert!(reloaded.dirty_keys().is_empty());
    assert!(reloaded.last_cascade_run.is_some());

    let events = log.read_all().unwrap();
    assert_eq!(events[0].event, EventKind::FieldUpdated);
    assert_eq!(events.last().unwrap().event, EventKind::CascadeApplied);
    assert_eq!(
        events
            .iter()
            .filter(|e| e.event == EventKind::ProcessReset)
            .count(),
        8
    );
}

#[test]
fn typo_target_is_reported_not_fatal() {
    let (_dir, schema, engine) = setup();
    let mut doc = PlanDocument::new("japan-2026", &schema);
    doc.add_destination("osaka", &schema).unwrap();
    doc.mark_dirty(&ProcessKey::at("osaka", "process_2_destination"), None)
        .unwrap();

    let plan = engine.compute_plan(&doc);
    assert_eq!(plan.actions.len(), 3);
    assert_eq!(
        plan.warnings,
        vec![PlanWarning::SchemaViolation {
            rule: 1,
            target: "process_6_budget".into(),
        }]
    );
    engine.apply_plan(&mut doc, &plan).unwrap();
    assert!(doc.dirty_keys().is_empty());
}

#[test]
fn package_selection_populates_and_date_change_resets_it() {
    let (_dir, schema, engine) = setup();
    let mut doc = PlanDocument::new("japan-2026", &schema);
    doc.add_destination("osaka", &schema).unwrap();

    let packages = ProcessKey::at("osaka", "process_3_4_packages");
    doc.set_field(
        &packages,
        "chosen_offer",
        json!({ "flight": { "number": "NH15" }, "hotel": { "name": "Cross Hotel" } }),
    )
    .unwrap();
    doc.set_process_status(&packages, ProcessStatus::Selected, None)
        .unwrap();
    engine.run_to_fixpoint(&mut doc, 8).unwrap();

    let transport = ProcessKey::at("osaka", "process_3_transportation");
    assert_eq!(doc.state(&transport).unwrap().status, ProcessStatus::Populated);

    // Moving the dates reopens the package and everything it populated,
    // without copying the old offer back in.
    doc.mark_dirty(&ProcessKey::global("process_1_date_anchor"), None)
        .unwrap();
    let run = engine.run_to_fixpoint(&mut doc, 8).unwrap();
    assert_eq!(run.rounds(), 1);
    assert_eq!(doc.state(&packages).unwrap().status, ProcessStatus::Pending);
    assert_eq!(doc.state(&transport).unwrap().status, ProcessStatus::Pending);
    assert_eq!(
        doc.state(&transport).unwrap().data["flight"]["number"],
        "NH15"
    );
}

#[test]
fn plan_from_before_a_concurrent_edit_is_stale() {
    let (_dir, schema, engine) = setup();
    let mut doc = PlanDocument::new("japan-2026", &schema);
    doc.add_destination("osaka", &schema).unwrap();
    doc.mark_dirty(&ProcessKey::global("process_1_date_anchor"), None)
        .unwrap();
    let plan = engine.compute_plan(&doc);

    doc.add_destination("kyoto", &schema).unwrap();
    assert!(matches!(
        engine.apply_plan(&mut doc, &plan),
        Err(CascadeError::StalePlan { .. })
    ));
}
