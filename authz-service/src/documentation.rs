//! OpenAPI documentation of the check service.

use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::handlers;
use crate::models::{CheckRequestBody, CheckResponse, CheckStatus};

/// Envelope of non-check errors (unknown host, configuration failures).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub status: u16,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(handlers::check, handlers::health),
    components(schemas(
        CheckRequestBody,
        CheckResponse,
        CheckStatus,
        ErrorResponse,
        ErrorBody,
        HealthCheckResponse
    )),
    tags(
        (name = "check", description = "Request check endpoint"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
