//! Pattern-matching authorization over the dynamic authorization context.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::EvaluationError;
use crate::evaluator::{Evaluator, PipelineView};
use crate::json::PatternMatchingRule;

/// Authorization evaluator that applies a list of pattern-matching rules to
/// the authorization context. Every rule must hold for the request to be
/// authorized; an empty rule list authorizes unconditionally.
#[derive(Debug, Clone)]
pub struct PatternMatching {
    name: String,
    rules: Vec<PatternMatchingRule>,
}

impl PatternMatching {
    pub fn new(name: impl Into<String>, rules: Vec<PatternMatchingRule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }
}

#[async_trait]
impl Evaluator for PatternMatching {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        pipeline: &dyn PipelineView,
        _cancellation: &CancellationToken,
    ) -> Result<Value, EvaluationError> {
        let context: Value = serde_json::from_str(&pipeline.authorization_json())
            .map_err(|error| {
                EvaluationError::Failure(format!("malformed authorization context: {error}"))
            })?;

        for rule in &self.rules {
            if !rule.holds(&context)? {
                return Err(EvaluationError::Unauthorized);
            }
        }

        Ok(Value::Bool(true))
    }
}
