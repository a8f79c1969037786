// rule.rs — The readiness rule tree.
//
// Rules are written as compact JSON (or YAML) objects:
//
//   { "present": "flight.outbound.code" }
//   { "min_length": "hotels", "min": 2 }
//   { "for_each": "travelers", "all": [ { "present": "passport" } ] }
//   { "all": [ ... ] }      { "any": [ ... ] }
//
// Parsing is strict about types (a `min` must be a non-negative integer)
// but tolerant of empty combinators; those are rejected at evaluation time
// so that a block with nothing in it can never pass.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MalformedRule;

/// A single rule: a leaf predicate or a nested block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Rule {
    /// Passes iff the value at `path` is non-null and not a blank string.
    Present { path: String },

    /// Passes iff the value at `path` is an array with at least `min` items.
    MinLength { path: String, min: u64 },

    /// Evaluates `block` once per element of the array at `path`, with the
    /// element as the evaluation root.
    ForEach { path: String, block: RuleBlock },

    /// A nested `all` / `any` block.
    Block(RuleBlock),
}

/// An `all` / `any` combinator block.
///
/// When both lists are given, both must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct RuleBlock {
    pub all: Option<Vec<Rule>>,
    pub any: Option<Vec<Rule>>,
}

impl Rule {
    pub fn present(path: impl Into<String>) -> Self {
        Rule::Present { path: path.into() }
    }

    pub fn min_length(path: impl Into<String>, min: u64) -> Self {
        Rule::MinLength {
            path: path.into(),
            min,
        }
    }

    pub fn for_each(path: impl Into<String>, block: RuleBlock) -> Self {
        Rule::ForEach {
            path: path.into(),
            block,
        }
    }

    /// Parse a rule from its JSON form. `location` names the rule's position
    /// in the enclosing tree for error messages.
    pub fn from_value(value: &Value, location: &str) -> Result<Self, MalformedRule> {
        let Value::Object(map) = value else {
            return Err(MalformedRule::new(location, "expected an object"));
        };

        if let Some(path) = map.get("present") {
            return Ok(Rule::Present {
                path: path_string(path, location, "present")?,
            });
        }

        if let Some(path) = map.get("min_length") {
            let path = path_string(path, location, "min_length")?;
            let min = map.get("min").and_then(Value::as_u64).ok_or_else(|| {
                MalformedRule::new(location, "min_length requires a non-negative integer `min`")
            })?;
            return Ok(Rule::MinLength { path, min });
        }

        if let Some(path) = map.get("for_each") {
            let path = path_string(path, location, "for_each")?;
            let block = RuleBlock::from_map(map, &format!("{location}.for_each"))?;
            return Ok(Rule::ForEach { path, block });
        }

        if map.contains_key("all") || map.contains_key("any") {
            return Ok(Rule::Block(RuleBlock::from_map(map, location)?));
        }

        Err(MalformedRule::new(
            location,
            "expected one of `present`, `min_length`, `for_each`, `all`, `any`",
        ))
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        match self {
            Rule::Present { path } => {
                map.insert("present".into(), Value::String(path.clone()));
            }
            Rule::MinLength { path, min } => {
                map.insert("min_length".into(), Value::String(path.clone()));
                map.insert("min".into(), Value::from(*min));
            }
            Rule::ForEach { path, block } => {
                map.insert("for_each".into(), Value::String(path.clone()));
                block.write_into(&mut map);
            }
            Rule::Block(block) => block.write_into(&mut map),
        }
        Value::Object(map)
    }
}

impl RuleBlock {
    pub fn all(rules: Vec<Rule>) -> Self {
        Self {
            all: Some(rules),
            any: None,
        }
    }

    pub fn any(rules: Vec<Rule>) -> Self {
        Self {
            all: None,
            any: Some(rules),
        }
    }

    /// Parse a block from its JSON form.
    ///
    /// A block with neither `all` nor `any` parses successfully; evaluation
    /// is what rejects it.
    pub fn from_value(value: &Value) -> Result<Self, MalformedRule> {
        match value {
            Value::Object(map) => Self::from_map(map, "<root>"),
            _ => Err(MalformedRule::new("<root>", "rule block must be an object")),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        self.write_into(&mut map);
        Value::Object(map)
    }

    /// True when neither combinator is declared.
    pub fn is_undeclared(&self) -> bool {
        self.all.is_none() && self.any.is_none()
    }

    fn from_map(map: &Map<String, Value>, location: &str) -> Result<Self, MalformedRule> {
        Ok(Self {
            all: rule_list(map.get("all"), &format!("{location}.all"))?,
            any: rule_list(map.get("any"), &format!("{location}.any"))?,
        })
    }

    fn write_into(&self, map: &mut Map<String, Value>) {
        if let Some(all) = &self.all {
            map.insert("all".into(), Value::Array(all.iter().map(Rule::to_value).collect()));
        }
        if let Some(any) = &self.any {
            map.insert("any".into(), Value::Array(any.iter().map(Rule::to_value).collect()));
        }
    }
}

fn path_string(value: &Value, location: &str, key: &str) -> Result<String, MalformedRule> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MalformedRule::new(location, format!("`{key}` must be a path string")))
}

fn rule_list(value: Option<&Value>, location: &str) -> Result<Option<Vec<Rule>>, MalformedRule> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Rule::from_value(item, &format!("{location}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(MalformedRule::new(location, "expected an array of rules")),
    }
}

impl TryFrom<Value> for Rule {
    type Error = MalformedRule;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Rule::from_value(&value, "<root>")
    }
}

impl From<Rule> for Value {
    fn from(rule: Rule) -> Self {
        rule.to_value()
    }
}

impl TryFrom<Value> for RuleBlock {
    type Error = MalformedRule;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        RuleBlock::from_value(&value)
    }
}

impl From<RuleBlock> for Value {
    fn from(block: RuleBlock) -> Self {
        block.to_value()
    }
}
