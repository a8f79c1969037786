// evaluator.rs — Fail-closed evaluation of rule trees against a document.
//
// Evaluation never errors. Anything the evaluator cannot make sense of
// (missing block, malformed rule, empty combinator, non-array for_each
// target) resolves to "not passed" with a diagnostic.
//
// Reporting rules:
//   all — aggregates missing fields and diagnostics from every child.
//   any — if one child passes, the block passes with nothing reported;
//         otherwise every child's report is kept.
//   for_each — each element is evaluated as its own root; reports are
//         prefixed with `path[i]` so they point at the failing element.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path;
use crate::rule::{Rule, RuleBlock};

/// The result of evaluating a rule or block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub passed: bool,
    /// Document paths (relative to the evaluation root) that were required
    /// but absent.
    #[serde(default)]
    pub missing: Vec<String>,
    /// Human-readable reasons that are not simple missing fields.
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

impl RuleOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    fn missing(path: String) -> Self {
        Self {
            passed: false,
            missing: vec![path],
            diagnostics: Vec::new(),
        }
    }

    fn diagnostic(message: String) -> Self {
        Self {
            passed: false,
            missing: Vec::new(),
            diagnostics: vec![message],
        }
    }

    /// Conjoin `other` into `self`, keeping both reports.
    fn and(&mut self, other: RuleOutcome) {
        self.passed = self.passed && other.passed;
        self.missing.extend(other.missing);
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Evaluate a raw (JSON) rule block against `data`.
///
/// `None`, `null`, a non-object, a block with neither `all` nor `any`, and an
/// empty `all` / `any` list all evaluate to not passed.
pub fn evaluate_rule_block(block: Option<&Value>, data: &Value) -> RuleOutcome {
    let Some(raw) = block.filter(|v| !v.is_null()) else {
        return RuleOutcome::diagnostic("rule block is missing".to_string());
    };
    match RuleBlock::from_value(raw) {
        Ok(block) => evaluate_block(&block, data),
        Err(malformed) => {
            tracing::debug!("treating malformed rule block as failed: {}", malformed);
            RuleOutcome::diagnostic(malformed.to_string())
        }
    }
}

/// Evaluate a parsed block against `data`.
pub fn evaluate_block(block: &RuleBlock, data: &Value) -> RuleOutcome {
    block_at(block, data, "")
}

/// Evaluate a single rule against `data`.
pub fn evaluate_rule(rule: &Rule, data: &Value) -> RuleOutcome {
    rule_at(rule, data, "")
}

fn block_at(block: &RuleBlock, data: &Value, ctx: &str) -> RuleOutcome {
    let here = if ctx.is_empty() { "<root>" } else { ctx };
    if let Some(rejected) = reject_malformed(block, here) {
        return rejected;
    }

    let mut outcome = RuleOutcome::pass();
    if let Some(rules) = &block.all {
        outcome.and(all_of(rules, data, ctx));
    }
    if let Some(rules) = &block.any {
        outcome.and(any_of(rules, data, ctx));
    }
    outcome
}

/// The failing outcome for a block that can never pass: no combinator at
/// all, or an empty `all` / `any` list. `None` when the block is well formed.
fn reject_malformed(block: &RuleBlock, here: &str) -> Option<RuleOutcome> {
    if block.is_undeclared() {
        return Some(RuleOutcome::diagnostic(format!(
            "{here}: rule block has neither `all` nor `any`"
        )));
    }
    let mut outcome = RuleOutcome::pass();
    if block.all.as_ref().is_some_and(Vec::is_empty) {
        outcome.and(RuleOutcome::diagnostic(format!("{here}: `all` is empty")));
    }
    if block.any.as_ref().is_some_and(Vec::is_empty) {
        outcome.and(RuleOutcome::diagnostic(format!("{here}: `any` is empty")));
    }
    (!outcome.passed).then_some(outcome)
}

fn all_of(rules: &[Rule], data: &Value, ctx: &str) -> RuleOutcome {
    let mut outcome = RuleOutcome::pass();
    for rule in rules {
        outcome.and(rule_at(rule, data, ctx));
    }
    outcome
}

fn any_of(rules: &[Rule], data: &Value, ctx: &str) -> RuleOutcome {
    // Default is "not passed" with nothing reported.
    let mut failed = RuleOutcome::default();
    for rule in rules {
        let outcome = rule_at(rule, data, ctx);
        if outcome.passed {
            return RuleOutcome::pass();
        }
        failed.and(outcome);
    }
    failed
}

fn rule_at(rule: &Rule, data: &Value, ctx: &str) -> RuleOutcome {
    match rule {
        Rule::Present { path: p } => match path::resolve(data, p) {
            Ok(value) if path::is_present(value) => RuleOutcome::pass(),
            _ => RuleOutcome::missing(join(ctx, p)),
        },

        Rule::MinLength { path: p, min } => {
            let len = path::resolve(data, p)
                .ok()
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            if len as u64 >= *min {
                RuleOutcome::pass()
            } else {
                let full = join(ctx, p);
                let mut outcome = RuleOutcome::missing(full.clone());
                outcome.diagnostics.push(format!(
                    "{full}: expected at least {min} item(s), found {len}"
                ));
                outcome
            }
        }

        Rule::ForEach { path: p, block } => {
            let full = join(ctx, p);
            match path::resolve(data, p) {
                Ok(Value::Array(items)) => {
                    // Checked up front so an empty array cannot hide it.
                    if let Some(rejected) = reject_malformed(block, &full) {
                        return rejected;
                    }
                    let mut outcome = RuleOutcome::pass();
                    for (i, item) in items.iter().enumerate() {
                        outcome.and(block_at(block, item, &format!("{full}[{i}]")));
                    }
                    outcome
                }
                _ => RuleOutcome::diagnostic(format!("{full}: expected an array")),
            }
        }

        Rule::Block(block) => block_at(block, data, ctx),
    }
}

/// Join an evaluation context (`travelers[1]`) with a relative path (`name`).
fn join(ctx: &str, path: &str) -> String {
    if ctx.is_empty() {
        path.to_string()
    } else {
        format!("{ctx}.{path}")
    }
}
