//! Concurrent fan-out of a phase's evaluators under a completion strategy.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::EvaluationError;
use crate::evaluator::{EvaluationResponse, Evaluator};
use crate::pipeline::AuthPipeline;

/// How the completion of one evaluator affects its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStrategy {
    /// The first success cancels the remaining evaluators.
    OneOf,
    /// The first failure cancels the remaining evaluators.
    AllOf,
    /// Every evaluator runs to completion.
    AnyOf,
}

/// Spawns one task per evaluator and returns the stream of their responses.
///
/// The shared scope is a child of the pipeline's parent scope; depending on
/// the strategy, the first success or the first failure cancels it for the
/// siblings. A task that observes cancellation before invoking its evaluator
/// emits nothing; a task cancelled mid-call still emits exactly one response
/// carrying the scope error. The channel is buffered to the number of
/// evaluators so no task ever blocks on send, and it closes once every
/// spawned task has finished.
pub fn spawn_evaluators(
    pipeline: &Arc<AuthPipeline>,
    evaluators: &[Arc<dyn Evaluator>],
    strategy: EvaluationStrategy,
) -> mpsc::Receiver<EvaluationResponse> {
    let (sender, receiver) = mpsc::channel(evaluators.len().max(1));
    let scope = pipeline.parent_scope().child_token();

    for (index, evaluator) in evaluators.iter().enumerate() {
        let evaluator = Arc::clone(evaluator);
        let pipeline = Arc::clone(pipeline);
        let scope = scope.clone();
        let sender = sender.clone();

        tokio::spawn(async move {
            if scope.is_cancelled() {
                debug!(evaluator = evaluator.name(), "evaluation skipped");
                return;
            }

            let result = tokio::select! {
                () = scope.cancelled() => Err(EvaluationError::Cancelled),
                result = evaluator.call(pipeline.as_view(), &scope) => result,
            };

            match (&result, strategy) {
                (Ok(_), EvaluationStrategy::OneOf) | (Err(_), EvaluationStrategy::AllOf) => {
                    scope.cancel();
                }
                _ => {}
            }

            let response = EvaluationResponse {
                index,
                name: evaluator.name().to_string(),
                result,
            };
            // Send only fails when the consumer already returned, which is a
            // valid early exit for short-circuiting phases.
            let _ = sender.send(response).await;
        });
    }

    receiver
}
