//! Dot-path selection and pattern-matching rules over dynamic JSON values.
//!
//! The authorization context is untyped; selectors descend it one segment at
//! a time and rules compare whatever they find. An absent path is a
//! well-defined miss, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EvaluationError;

/// Resolves a dot-separated path against a dynamic value.
///
/// Mappings are descended by key. Sequences are descended by purely numeric
/// segments. Anything else ends the walk with `None`.
#[must_use]
pub fn select<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// The natural string form of a resolved node.
///
/// Misses and nulls read as empty, strings read unquoted, every other node
/// reads as its JSON serialization.
#[must_use]
pub fn stringify(node: Option<&Value>) -> String {
    match node {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Comparison applied by a pattern-matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternOperator {
    Eq,
    Neq,
    Incl,
    Excl,
    Matches,
}

/// One pattern-matching rule: a selector into the authorization context, an
/// operator and the expected value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatchingRule {
    pub selector: String,
    pub operator: PatternOperator,
    pub value: String,
}

impl PatternMatchingRule {
    /// Whether the rule holds against the given context.
    pub fn holds(&self, context: &Value) -> Result<bool, EvaluationError> {
        let actual = select(context, &self.selector);
        match self.operator {
            PatternOperator::Eq => Ok(stringify(actual) == self.value),
            PatternOperator::Neq => Ok(stringify(actual) != self.value),
            PatternOperator::Incl => Ok(contains(actual, &self.value)),
            PatternOperator::Excl => Ok(!contains(actual, &self.value)),
            PatternOperator::Matches => {
                let pattern = regex::Regex::new(&self.value)?;
                Ok(pattern.is_match(&stringify(actual)))
            }
        }
    }
}

/// Whether the node is a sequence with an element whose string form equals
/// `value`. Non-sequences contain nothing.
fn contains(node: Option<&Value>, value: &str) -> bool {
    node.and_then(Value::as_array)
        .is_some_and(|items| items.iter().any(|item| stringify(Some(item)) == value))
}
