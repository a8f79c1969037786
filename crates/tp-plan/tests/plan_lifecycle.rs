// plan_lifecycle.rs — Document, store, and event log working together.
//
// Two "sessions" load the same plan file; the second one to save must be
// turned away rather than silently overwrite the first.

use serde_json::json;
use tempfile::TempDir;
use tp_plan::{
    DocumentStore, EventKind, EventLog, PlanDocument, PlanError, ProcessStatus, SchemaContract,
};

fn schema() -> SchemaContract {
    SchemaContract::new(
        vec![
            "process_1_date_anchor".into(),
            "process_3_transportation".into(),
            "process_4_accommodation".into(),
        ],
        vec!["process_1_date_anchor".into()],
    )
}

#[test]
fn mutations_persist_and_log_events() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::new(dir.path().join("plan.json"));
    let log = EventLog::new(dir.path().join("events.jsonl"));
    let schema = schema();

    let doc = PlanDocument::new("japan-2026", &schema);
    store.create(&doc).unwrap();

    let mut doc = store.load().unwrap();
    let base = doc.version;
    let mut events = vec![doc.add_destination("osaka", &schema).unwrap()];
    let hotel = doc.resolve_key(None, "process_4_accommodation").unwrap();
    events.push(
        doc.set_process_status(&hotel, ProcessStatus::Researching, None)
            .unwrap(),
    );
    let dates = doc.resolve_key(Some("osaka"), "process_1_date_anchor").unwrap();
    assert_eq!(dates.destination, None);
    events.push(doc.set_field(&dates, "start", json!("2026-11-03")).unwrap());
    store.save(&doc, base).unwrap();
    log.append(&events).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, doc);
    assert_eq!(reloaded.active_destination.as_deref(), Some("osaka"));
    assert_eq!(reloaded.dirty_keys(), vec![dates.clone()]);
    assert_eq!(
        reloaded.state(&dates).unwrap().data["start"],
        json!("2026-11-03")
    );

    let kinds: Vec<EventKind> = log.read_all().unwrap().into_iter().map(|e| e.event).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::DestinationCreated,
            EventKind::StatusChanged,
            EventKind::FieldUpdated
        ]
    );
    assert_eq!(log.tail(1).unwrap()[0].process.as_deref(), Some("process_1_date_anchor"));
}

#[test]
fn second_writer_gets_version_conflict() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::new(dir.path().join("plan.json"));
    let schema = schema();
    store.create(&PlanDocument::new("trip", &schema)).unwrap();

    let mut first = store.load().unwrap();
    let mut second = store.load().unwrap();
    let base = first.version;

    first.add_destination("osaka", &schema).unwrap();
    store.save(&first, base).unwrap();

    second.add_destination("kyoto", &schema).unwrap();
    let err = store.save(&second, base).unwrap_err();
    assert!(matches!(err, PlanError::VersionConflict { .. }));

    let stored = store.load().unwrap();
    assert!(stored.destinations.contains_key("osaka"));
    assert!(!stored.destinations.contains_key("kyoto"));
}

#[test]
fn rejected_transition_leaves_document_untouched() {
    let schema = schema();
    let mut doc = PlanDocument::new("trip", &schema);
    doc.add_destination("osaka", &schema).unwrap();
    let key = doc.resolve_key(None, "process_3_transportation").unwrap();
    doc.set_process_status(&key, ProcessStatus::Selected, None)
        .unwrap();

    let before = doc.clone();
    let err = doc
        .set_process_status(&key, ProcessStatus::Researching, None)
        .unwrap_err();
    assert!(matches!(err, PlanError::InvalidTransition { .. }));
    assert_eq!(doc, before);
}
