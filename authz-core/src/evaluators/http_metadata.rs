//! Ad-hoc metadata from an external HTTP endpoint.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::EvaluationError;
use crate::evaluator::{Evaluator, PipelineView};

/// HTTP method of the metadata callout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Metadata evaluator that fetches a JSON document from an HTTP endpoint.
///
/// `POST` callouts carry the authorization context resolved so far, so the
/// endpoint can tailor its answer to the already-verified identity. The
/// callout is raced against the cancellation token; a cancelled phase aborts
/// it promptly.
pub struct HttpMetadata {
    name: String,
    endpoint: String,
    method: HttpMethod,
    client: reqwest::Client,
}

impl HttpMetadata {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            method,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Evaluator for HttpMetadata {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        pipeline: &dyn PipelineView,
        cancellation: &CancellationToken,
    ) -> Result<Value, EvaluationError> {
        let request = match self.method {
            HttpMethod::Get => self.client.get(&self.endpoint),
            HttpMethod::Post => self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .body(pipeline.authorization_json()),
        };

        let fetch = async {
            let response = request
                .send()
                .await
                .map_err(|error| EvaluationError::Failure(error.to_string()))?;

            if !response.status().is_success() {
                return Err(EvaluationError::Failure(format!(
                    "metadata endpoint returned {}",
                    response.status()
                )));
            }

            response
                .json::<Value>()
                .await
                .map_err(|error| EvaluationError::Failure(error.to_string()))
        };

        tokio::select! {
            () = cancellation.cancelled() => Err(EvaluationError::Cancelled),
            result = fetch => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::{ApiConfig, AuthPipeline};
    use crate::request::CheckRequest;

    fn pipeline() -> Arc<AuthPipeline> {
        AuthPipeline::new(
            CancellationToken::new(),
            CheckRequest::default(),
            Arc::new(ApiConfig::default()),
        )
    }

    #[tokio::test]
    async fn cancelled_scope_aborts_the_callout() {
        let evaluator = HttpMetadata::new("geo", "http://127.0.0.1:1/meta", HttpMethod::Get);
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let error = evaluator
            .call(pipeline().as_ref(), &cancellation)
            .await
            .unwrap_err();
        assert!(matches!(error, EvaluationError::Cancelled));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_opaque_failure() {
        let evaluator = HttpMetadata::new("geo", "http://127.0.0.1:1/meta", HttpMethod::Get);

        let error = evaluator
            .call(pipeline().as_ref(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, EvaluationError::Failure(_)));
    }
}
