//! The contract every identity, metadata and authorization step implements,
//! and the narrow pipeline view handed to it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::EvaluationError;
use crate::request::CheckRequest;

/// Read-only view of the pipeline exposed to evaluators.
///
/// Evaluators reach resolved state through this view instead of holding the
/// pipeline itself, which keeps the result maps single-writer.
pub trait PipelineView: Send + Sync {
    /// The request under evaluation.
    fn request(&self) -> &CheckRequest;

    /// The resolved identity as a `(config name, object)` pair, if any.
    fn resolved_identity(&self) -> Option<(String, Value)>;

    /// The resolved metadata objects, keyed by config name.
    fn resolved_metadata(&self) -> HashMap<String, Value>;

    /// The authorization context serialized as JSON, reflecting the identity
    /// and metadata resolved at the moment of the call.
    fn authorization_json(&self) -> String;
}

/// One evaluation step of the pipeline.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Stable identifier, used to key this evaluator's contribution to the
    /// authorization context.
    fn name(&self) -> &str;

    /// Runs the step. Implementations may block on I/O and must watch the
    /// cancellation token around it.
    async fn call(
        &self,
        pipeline: &dyn PipelineView,
        cancellation: &CancellationToken,
    ) -> Result<Value, EvaluationError>;
}

/// Outcome of one evaluator within a phase.
#[derive(Debug)]
pub struct EvaluationResponse {
    /// Position of the evaluator in its phase's config list.
    pub index: usize,
    /// Name of the evaluator that produced the outcome.
    pub name: String,
    /// The resolved object, or the failure.
    pub result: Result<Value, EvaluationError>,
}

impl EvaluationResponse {
    #[must_use]
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_follows_the_result() {
        let granted = EvaluationResponse {
            index: 0,
            name: "gate".to_string(),
            result: Ok(json!(true)),
        };
        assert!(granted.success());

        let failed = EvaluationResponse {
            index: 1,
            name: "gate".to_string(),
            result: Err(EvaluationError::Unauthorized),
        };
        assert!(!failed.success());
    }
}
