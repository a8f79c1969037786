// engine.rs — CascadeEngine: compute and apply cascade plans.
//
// compute_plan is a pure function of the document snapshot: for every dirty
// (destination, process) it fires the matching trigger rules, expands their
// targets, scopes them to destinations, and collects one action per
// (destination, process, kind). apply_plan is the only mutating step; it
// works on a clone of the document and swaps it in only when every action
// succeeded.
//
// Chained cascades: a reset target that is itself the source of reset rules
// is left dirty (`propagate`), so the next round cascades from it. Populate
// rules only fire for a source that has not been reopened (status other than
// pending), so a reset never re-copies a stale selection downstream. Within
// one plan a reset also wins over any populate into or out of the same key.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};
use tp_plan::wildcard;
use tp_plan::{EventKind, PlanDocument, PlanEvent, ProcessKey, ProcessStatus, SchemaContract};

use crate::error::CascadeError;
use crate::plan::{ActionKind, CascadeAction, CascadePlan, PlanWarning};
use crate::trigger::{PopulateSpec, TriggerRule, TriggerScope, TriggerTable};

/// What `apply_plan` did.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    /// Document version after the apply (the new version token).
    pub version: u64,
    pub reset: usize,
    pub populated: usize,
    /// Input dirty flags that were cleared.
    pub cleared: usize,
    /// Events to append to the event log, in order.
    pub events: Vec<PlanEvent>,
}

/// Every round of a `run_to_fixpoint` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeRun {
    pub plans: Vec<CascadePlan>,
    pub events: Vec<PlanEvent>,
    pub warnings: Vec<PlanWarning>,
}

impl CascadeRun {
    pub fn rounds(&self) -> usize {
        self.plans.len()
    }

    pub fn action_count(&self) -> usize {
        self.plans.iter().map(|p| p.actions.len()).sum()
    }
}

/// Computes and applies cascade plans for one trigger table and schema.
#[derive(Debug, Clone)]
pub struct CascadeEngine {
    table: TriggerTable,
    schema: SchemaContract,
}

type ActionSlot = (Option<String>, String, ActionKind);

impl CascadeEngine {
    pub fn new(table: TriggerTable, schema: SchemaContract) -> Self {
        Self { table, schema }
    }

    /// Like `new`, but rejects trigger tables that contain a cycle.
    pub fn try_new(table: TriggerTable, schema: SchemaContract) -> Result<Self, CascadeError> {
        table.validate(&schema)?;
        Ok(Self::new(table, schema))
    }

    pub fn table(&self) -> &TriggerTable {
        &self.table
    }

    pub fn schema(&self) -> &SchemaContract {
        &self.schema
    }

    /// Compute the actions implied by the document's current dirty flags.
    ///
    /// Never fails: unknown targets, missing destinations, and absent
    /// populate sources become warnings on the plan.
    pub fn compute_plan(&self, doc: &PlanDocument) -> CascadePlan {
        let mut plan = CascadePlan::new(doc.version);
        let mut slots: BTreeMap<ActionSlot, CascadeAction> = BTreeMap::new();

        for key in doc.dirty_keys() {
            let mut produced = false;
            for (index, rule) in self.table.rules_for(&key.process) {
                let actions = self.fire(doc, &key, index, rule, &mut plan.warnings);
                for action in actions {
                    produced = true;
                    merge_action(&mut slots, action, &key);
                }
            }
            if produced {
                plan.inputs.push(key);
            } else {
                tracing::debug!("{} is dirty but fired no actions; flag kept", key);
            }
        }

        let actions: Vec<CascadeAction> = slots.into_values().collect();
        let (actions, deferred) = drop_superseded_populates(actions, &mut plan.warnings);
        // A source whose populate lost to a reset of its target stays dirty
        // and populates again next round, once the target is pending.
        plan.inputs.retain(|key| !deferred.contains(key));
        plan.actions = actions;
        tracing::debug!(
            "computed plan {}: {} inputs, {} actions, {} warnings",
            plan.plan_id,
            plan.inputs.len(),
            plan.actions.len(),
            plan.warnings.len()
        );
        plan
    }

    /// Resolve one fired rule into actions for the dirty `source`.
    fn fire(
        &self,
        doc: &PlanDocument,
        source: &ProcessKey,
        index: usize,
        rule: &TriggerRule,
        warnings: &mut Vec<PlanWarning>,
    ) -> Vec<CascadeAction> {
        let nodes = &self.schema.process_nodes;
        let expanded = wildcard::expand_patterns(rule.targets.as_slice(), nodes);
        let unknown = wildcard::validate_targets(&expanded, nodes);
        for target in &unknown {
            tracing::warn!("trigger #{}: dropping unknown target '{}'", index, target);
            push_warning(
                warnings,
                PlanWarning::SchemaViolation {
                    rule: index,
                    target: target.clone(),
                },
            );
        }
        let targets: Vec<String> = expanded
            .into_iter()
            .filter(|target| !unknown.contains(target))
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        let source_data = match (rule.action, &rule.populate_spec) {
            (ActionKind::Reset, _) => None,
            (ActionKind::Populate, spec) => {
                match self.populate_source(doc, source, index, spec.as_ref(), warnings) {
                    Some(data) => Some(data),
                    None => return Vec::new(),
                }
            }
        };

        let destinations = self.scoped_destinations(doc, source, index, rule, &targets, warnings);

        let mut actions = Vec::new();
        for target in &targets {
            let target_destinations: Vec<Option<String>> = if self.schema.is_global(target) {
                vec![None]
            } else {
                destinations.iter().cloned().map(Some).collect()
            };
            let payload = match (&source_data, &rule.populate_spec) {
                (Some(data), Some(spec)) => {
                    Some(populate_payload(data, spec, source, index, target, warnings))
                }
                _ => None,
            };
            for destination in target_destinations {
                actions.push(CascadeAction {
                    destination,
                    process: target.clone(),
                    kind: rule.action,
                    payload: payload.clone(),
                    propagate: self.table.has_reset_dependents(target),
                    triggered_by: vec![source.clone()],
                });
            }
        }
        actions
    }

    /// The destinations a rule's per-destination targets resolve to.
    fn scoped_destinations(
        &self,
        doc: &PlanDocument,
        source: &ProcessKey,
        index: usize,
        rule: &TriggerRule,
        targets: &[String],
        warnings: &mut Vec<PlanWarning>,
    ) -> Vec<String> {
        match rule.scope {
            TriggerScope::Global => doc.destinations.keys().cloned().collect(),
            TriggerScope::CurrentDestination => {
                if targets.iter().all(|t| self.schema.is_global(t)) {
                    return Vec::new();
                }
                let destination = match source
                    .destination
                    .clone()
                    .or_else(|| doc.active_destination.clone())
                {
                    Some(d) => d,
                    None => {
                        tracing::warn!(
                            "trigger #{}: no active destination for {}; skipping",
                            index,
                            source
                        );
                        push_warning(
                            warnings,
                            PlanWarning::NoActiveDestination {
                                rule: index,
                                source: source.to_string(),
                            },
                        );
                        return Vec::new();
                    }
                };
                if !doc.destinations.contains_key(&destination) {
                    tracing::warn!(
                        "trigger #{}: destination '{}' not in document; skipping",
                        index,
                        destination
                    );
                    push_warning(
                        warnings,
                        PlanWarning::MissingDestination {
                            rule: index,
                            destination,
                        },
                    );
                    return Vec::new();
                }
                vec![destination]
            }
        }
    }

    /// The object a populate rule copies from, if it can fire at all.
    fn populate_source(
        &self,
        doc: &PlanDocument,
        source: &ProcessKey,
        index: usize,
        spec: Option<&PopulateSpec>,
        warnings: &mut Vec<PlanWarning>,
    ) -> Option<Value> {
        let state = doc.state(source)?;
        if state.status == ProcessStatus::Pending {
            tracing::debug!(
                "trigger #{}: {} is pending; not populating from it",
                index,
                source
            );
            return None;
        }
        let Some(spec) = spec else {
            return Some(Value::Object(Map::new()));
        };
        match tp_rules::path::resolve(&state.data, &spec.source) {
            Ok(data) => Some(data.clone()),
            Err(_) => {
                tracing::warn!(
                    "trigger #{}: {} has no '{}'; populate skipped",
                    index,
                    source,
                    spec.source
                );
                push_warning(
                    warnings,
                    PlanWarning::PopulateSourceMissing {
                        rule: index,
                        source: source.to_string(),
                        path: spec.source.clone(),
                    },
                );
                None
            }
        }
    }

    /// Apply `plan` to `doc`.
    ///
    /// All-or-nothing: on any error the document is left exactly as it was.
    /// The plan must have been computed from the document's current version.
    pub fn apply_plan(
        &self,
        doc: &mut PlanDocument,
        plan: &CascadePlan,
    ) -> Result<ApplyOutcome, CascadeError> {
        if plan.document_version != doc.version {
            return Err(CascadeError::StalePlan {
                plan_version: plan.document_version,
                document_version: doc.version,
            });
        }

        let at = plan.computed_at;
        let mut next = doc.clone();
        let mut events = Vec::new();
        let (mut reset, mut populated) = (0, 0);

        for action in &plan.actions {
            if !self.schema.contains(&action.process) {
                return Err(CascadeError::UnknownProcess(action.process.clone()));
            }
            let key = action.key();
            let state = next.state_entry(&key)?;
            let from = state.status;
            let reason = cascade_reason(action);
            match action.kind {
                ActionKind::Reset => {
                    state.reset(reason.clone(), action.propagate, at);
                    reset += 1;
                    events.push(
                        PlanEvent::new(EventKind::ProcessReset)
                            .at(at)
                            .for_key(&key)
                            .with_data(json!({ "from": from, "reason": reason })),
                    );
                }
                ActionKind::Populate => {
                    let payload = action
                        .payload
                        .clone()
                        .unwrap_or_else(|| Value::Object(Map::new()));
                    state.populate(&payload, reason.clone(), action.propagate, at)?;
                    populated += 1;
                    events.push(
                        PlanEvent::new(EventKind::ProcessPopulated)
                            .at(at)
                            .for_key(&key)
                            .with_data(json!({ "from": from, "reason": reason, "fields": payload })),
                    );
                }
            }
            tracing::debug!("{} {}: {} (propagate={})", action.kind, key, from, action.propagate);
        }

        let mut cleared = 0;
        for input in &plan.inputs {
            if next.state_mut(input)?.clear_dirty() {
                cleared += 1;
            }
        }

        next.last_cascade_run = Some(at);
        if !plan.actions.is_empty() || cleared > 0 {
            next.touch();
            events.push(
                PlanEvent::new(EventKind::CascadeApplied).at(at).with_data(json!({
                    "plan_id": plan.plan_id,
                    "inputs": plan.inputs.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "reset": reset,
                    "populated": populated,
                    "warnings": plan.warnings.len(),
                })),
            );
            tracing::info!(
                "applied plan {}: {} reset, {} populated, {} inputs cleared",
                plan.plan_id,
                reset,
                populated,
                cleared
            );
        }

        *doc = next;
        Ok(ApplyOutcome {
            version: doc.version,
            reset,
            populated,
            cleared,
            events,
        })
    }

    /// Compute and apply plans until one comes back empty.
    ///
    /// Either every round is committed or, on error, none is.
    pub fn run_to_fixpoint(
        &self,
        doc: &mut PlanDocument,
        max_rounds: usize,
    ) -> Result<CascadeRun, CascadeError> {
        let mut work = doc.clone();
        let mut run = CascadeRun {
            plans: Vec::new(),
            events: Vec::new(),
            warnings: Vec::new(),
        };

        loop {
            let plan = self.compute_plan(&work);
            for warning in &plan.warnings {
                push_warning(&mut run.warnings, warning.clone());
            }
            if plan.is_empty() {
                break;
            }
            if run.plans.len() == max_rounds {
                return Err(CascadeError::NotConverged { rounds: max_rounds });
            }
            let outcome = self.apply_plan(&mut work, &plan)?;
            run.events.extend(outcome.events);
            run.plans.push(plan);
        }

        *doc = work;
        Ok(run)
    }
}

/// Fold `action` into the slot for its (destination, process, kind).
fn merge_action(
    slots: &mut BTreeMap<ActionSlot, CascadeAction>,
    action: CascadeAction,
    source: &ProcessKey,
) {
    let slot = (action.destination.clone(), action.process.clone(), action.kind);
    match slots.get_mut(&slot) {
        None => {
            slots.insert(slot, action);
        }
        Some(existing) => {
            if !existing.triggered_by.contains(source) {
                existing.triggered_by.push(source.clone());
            }
            existing.propagate |= action.propagate;
            if let (Some(Value::Object(into)), Some(Value::Object(from))) =
                (existing.payload.as_mut(), action.payload)
            {
                for (path, value) in from {
                    into.entry(path).or_insert(value);
                }
            }
        }
    }
}

/// Drop every populate whose target or source is reset by the same plan.
///
/// Resets apply first, so a surviving populate would overwrite the reset
/// with data the plan has just invalidated. Returns the kept actions and
/// the sources to keep dirty: sources that were not reset themselves and
/// whose target was reset by some other process, so their selection still
/// stands and is copied in a later round.
fn drop_superseded_populates(
    actions: Vec<CascadeAction>,
    warnings: &mut Vec<PlanWarning>,
) -> (Vec<CascadeAction>, BTreeSet<ProcessKey>) {
    let reset: BTreeMap<ProcessKey, Vec<ProcessKey>> = actions
        .iter()
        .filter(|a| a.kind == ActionKind::Reset)
        .map(|a| (a.key(), a.triggered_by.clone()))
        .collect();
    let mut deferred = BTreeSet::new();
    let mut kept = Vec::with_capacity(actions.len());

    for action in actions {
        if action.kind != ActionKind::Populate {
            kept.push(action);
            continue;
        }
        let target = action.key();
        let hit = action
            .triggered_by
            .iter()
            .find(|source| reset.contains_key(*source))
            .cloned()
            .or_else(|| reset.contains_key(&target).then(|| target.clone()));
        let Some(hit) = hit else {
            kept.push(action);
            continue;
        };
        tracing::warn!("populate of {} dropped: {} is reset in the same plan", target, hit);
        if let Some(resetters) = reset.get(&target).filter(|_| hit == target) {
            deferred.extend(
                action
                    .triggered_by
                    .iter()
                    .filter(|source| !resetters.contains(*source))
                    .cloned(),
            );
        }
        push_warning(
            warnings,
            PlanWarning::PopulateSuperseded {
                target: target.to_string(),
                reset: hit.to_string(),
            },
        );
    }
    (kept, deferred)
}

/// Fields copied into `target`: `to → source[from]` for every matching copy.
fn populate_payload(
    source_data: &Value,
    spec: &PopulateSpec,
    source: &ProcessKey,
    index: usize,
    target: &str,
    warnings: &mut Vec<PlanWarning>,
) -> Value {
    let mut fields = Map::new();
    for copy in spec
        .fields
        .iter()
        .filter(|copy| wildcard::matches(&copy.target, target))
    {
        match tp_rules::path::resolve(source_data, &copy.from) {
            Ok(value) => {
                fields.insert(copy.to.clone(), value.clone());
            }
            Err(_) => push_warning(
                warnings,
                PlanWarning::PopulateSourceMissing {
                    rule: index,
                    source: source.to_string(),
                    path: format!("{}.{}", spec.source, copy.from),
                },
            ),
        }
    }
    Value::Object(fields)
}

fn cascade_reason(action: &CascadeAction) -> String {
    let sources: Vec<String> = action.triggered_by.iter().map(ToString::to_string).collect();
    match action.kind {
        ActionKind::Reset => format!("reset by cascade from {}", sources.join(", ")),
        ActionKind::Populate => format!("populated by cascade from {}", sources.join(", ")),
    }
}

fn push_warning(warnings: &mut Vec<PlanWarning>, warning: PlanWarning) {
    if !warnings.contains(&warning) {
        warnings.push(warning);
    }
}
