//! The per-request evaluation pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{EvaluationError, PipelineError};
use crate::evaluator::{Evaluator, PipelineView};
use crate::request::CheckRequest;
use crate::runner::{self, EvaluationStrategy};

/// Resolved configuration of one protected API: the ordered evaluator lists
/// of each phase. Built by the configuration layer and shared across checks,
/// so every evaluator must be safe to call concurrently.
#[derive(Default)]
pub struct ApiConfig {
    pub identity: Vec<Arc<dyn Evaluator>>,
    pub metadata: Vec<Arc<dyn Evaluator>>,
    pub authorization: Vec<Arc<dyn Evaluator>>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field(
                "identity",
                &self.identity.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field(
                "metadata",
                &self.metadata.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field(
                "authorization",
                &self
                    .authorization
                    .iter()
                    .map(|e| e.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Evaluates one check request against an API's configuration.
///
/// Identity, metadata and authorization run in that order. Each phase fans
/// its evaluators out concurrently and drains their responses in completion
/// order; the consumer loops below are the only writers of the result maps,
/// which are keyed by the evaluator's position in its config list.
pub struct AuthPipeline {
    parent_scope: CancellationToken,
    request: CheckRequest,
    api: Arc<ApiConfig>,
    identity: RwLock<HashMap<usize, Value>>,
    metadata: RwLock<HashMap<usize, Value>>,
    authorization: RwLock<HashMap<usize, Value>>,
}

impl AuthPipeline {
    #[must_use]
    pub fn new(
        parent_scope: CancellationToken,
        request: CheckRequest,
        api: Arc<ApiConfig>,
    ) -> Arc<Self> {
        Arc::new(Self {
            parent_scope,
            request,
            api,
            identity: RwLock::new(HashMap::new()),
            metadata: RwLock::new(HashMap::new()),
            authorization: RwLock::new(HashMap::new()),
        })
    }

    pub(crate) fn parent_scope(&self) -> &CancellationToken {
        &self.parent_scope
    }

    pub(crate) fn as_view(&self) -> &dyn PipelineView {
        self
    }

    /// Runs the full evaluation.
    ///
    /// On success exactly one identity entry is resolved, metadata holds
    /// whatever fetchers succeeded, and every authorization evaluator has
    /// granted a truthy object.
    pub async fn evaluate(self: &Arc<Self>) -> Result<(), PipelineError> {
        self.evaluate_identity()
            .await
            .map_err(PipelineError::Identity)?;
        self.evaluate_metadata().await;
        self.evaluate_authorization()
            .await
            .map_err(PipelineError::Authorization)?;
        Ok(())
    }

    /// Identity phase: the first evaluator to succeed wins and cancels its
    /// siblings. If none succeeds, the last error observed on the channel is
    /// returned.
    async fn evaluate_identity(self: &Arc<Self>) -> Result<(), EvaluationError> {
        if self.api.identity.is_empty() {
            return Err(EvaluationError::NoIdentityEvaluator);
        }

        let mut responses =
            runner::spawn_evaluators(self, &self.api.identity, EvaluationStrategy::OneOf);
        let mut last_error = None;

        while let Some(response) = responses.recv().await {
            match response.result {
                Ok(object) => {
                    debug!(evaluator = %response.name, "identity resolved");
                    self.identity.write().insert(response.index, object);
                    return Ok(());
                }
                Err(error) => {
                    debug!(evaluator = %response.name, %error, "identity evaluator failed");
                    last_error = Some(error);
                }
            }
        }

        // The channel can only drain without a single response when every
        // task skipped on an already-cancelled scope.
        Err(last_error.unwrap_or(EvaluationError::Cancelled))
    }

    /// Metadata phase: best effort. Failures are logged and dropped; the
    /// phase never fails the pipeline.
    async fn evaluate_metadata(self: &Arc<Self>) {
        if self.api.metadata.is_empty() {
            return;
        }

        let mut responses =
            runner::spawn_evaluators(self, &self.api.metadata, EvaluationStrategy::AnyOf);

        while let Some(response) = responses.recv().await {
            match response.result {
                Ok(object) => {
                    debug!(evaluator = %response.name, "metadata resolved");
                    self.metadata.write().insert(response.index, object);
                }
                Err(error) => {
                    debug!(evaluator = %response.name, %error, "metadata evaluator failed");
                }
            }
        }
    }

    /// Authorization phase: every evaluator must grant. The first failure is
    /// returned as-is and cancels the siblings.
    async fn evaluate_authorization(self: &Arc<Self>) -> Result<(), EvaluationError> {
        if self.api.authorization.is_empty() {
            return Ok(());
        }

        let mut responses =
            runner::spawn_evaluators(self, &self.api.authorization, EvaluationStrategy::AllOf);

        while let Some(response) = responses.recv().await {
            match response.result {
                Ok(object) if truthy(&object) => {
                    debug!(evaluator = %response.name, "authorization granted");
                    self.authorization.write().insert(response.index, object);
                }
                Ok(_) => {
                    debug!(evaluator = %response.name, "authorization object not truthy");
                    return Err(EvaluationError::Unauthorized);
                }
                Err(error) => {
                    debug!(evaluator = %response.name, %error, "authorization evaluator failed");
                    return Err(error);
                }
            }
        }

        Ok(())
    }

    /// The authorization context for the current pipeline state:
    /// `{"context": <request attributes>, "auth": {"identity": ...,
    /// "metadata": {<config name>: <object>}}}`.
    #[must_use]
    pub fn authorization_context(&self) -> Value {
        let identity = self
            .resolved_identity()
            .map_or(Value::Null, |(_, object)| object);

        let mut metadata = serde_json::Map::new();
        for (index, object) in self.metadata.read().iter() {
            if let Some(config) = self.api.metadata.get(*index) {
                metadata.insert(config.name().to_string(), object.clone());
            }
        }

        json!({
            "context": self.request.attributes,
            "auth": {
                "identity": identity,
                "metadata": Value::Object(metadata),
            }
        })
    }

    /// Objects granted by the authorization phase, keyed by evaluator name.
    #[must_use]
    pub fn resolved_authorization(&self) -> HashMap<String, Value> {
        self.authorization
            .read()
            .iter()
            .filter_map(|(index, object)| {
                self.api
                    .authorization
                    .get(*index)
                    .map(|config| (config.name().to_string(), object.clone()))
            })
            .collect()
    }
}

impl PipelineView for AuthPipeline {
    fn request(&self) -> &CheckRequest {
        &self.request
    }

    fn resolved_identity(&self) -> Option<(String, Value)> {
        self.identity
            .read()
            .iter()
            .find(|(_, object)| !object.is_null())
            .map(|(index, object)| {
                let name = self
                    .api
                    .identity
                    .get(*index)
                    .map(|config| config.name().to_string())
                    .unwrap_or_default();
                (name, object.clone())
            })
    }

    fn resolved_metadata(&self) -> HashMap<String, Value> {
        self.metadata
            .read()
            .iter()
            .filter(|(_, object)| !object.is_null())
            .filter_map(|(index, object)| {
                self.api
                    .metadata
                    .get(*index)
                    .map(|config| (config.name().to_string(), object.clone()))
            })
            .collect()
    }

    fn authorization_json(&self) -> String {
        self.authorization_context().to_string()
    }
}

fn truthy(object: &Value) -> bool {
    !matches!(object, Value::Null | Value::Bool(false))
}
