//! Data models and shared state of the check service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use authz_core::{ApiConfig, AttributeContext, EvaluationError, PipelineError};

/// Request body of `POST /v1/check`: the attribute tree of the intercepted
/// request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckRequestBody {
    /// Request attributes as forwarded by the proxy: `request.http` with
    /// lower-cased header names, path including the query string, method,
    /// host and scheme.
    #[schema(value_type = Object)]
    pub attributes: AttributeContext,
}

/// Outcome of one check, as enforced by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Ok,
    Unauthenticated,
    PermissionDenied,
    Internal,
}

impl CheckStatus {
    /// HTTP status carried by the proxy-facing response for this outcome.
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&PipelineError> for CheckStatus {
    fn from(error: &PipelineError) -> Self {
        match error {
            PipelineError::Identity(_) => Self::Unauthenticated,
            PipelineError::Authorization(EvaluationError::Unauthorized) => Self::PermissionDenied,
            PipelineError::Authorization(_) => Self::Internal,
        }
    }
}

/// Response body of `POST /v1/check`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckResponse {
    /// The check outcome.
    pub status: CheckStatus,
    /// Short cause, present on non-OK outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CheckResponse {
    #[must_use]
    pub fn allowed() -> Self {
        Self {
            status: CheckStatus::Ok,
            reason: None,
        }
    }

    #[must_use]
    pub fn denied(error: &PipelineError) -> Self {
        Self {
            status: CheckStatus::from(error),
            reason: Some(error.to_string()),
        }
    }
}

/// Application state: API configurations keyed by the host they protect.
pub struct AppState {
    pub apis: HashMap<String, Arc<ApiConfig>>,
    /// Overall deadline imposed on each check's evaluation scope.
    pub check_timeout: Duration,
}
