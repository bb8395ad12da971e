//! HTTP request handlers of the check service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tokio_util::sync::CancellationToken;

use authz_core::{AuthPipeline, CheckRequest};

use crate::documentation::HealthCheckResponse;
use crate::errors::AppError;
use crate::models::{AppState, CheckRequestBody, CheckResponse};

#[utoipa::path(
    post,
    path = "/v1/check",
    tag = "check",
    request_body = CheckRequestBody,
    responses(
        (status = 200, description = "Request allowed", body = CheckResponse),
        (status = 401, description = "No identity could be verified", body = CheckResponse),
        (status = 403, description = "Request denied by authorization policy", body = CheckResponse),
        (status = 404, description = "No API configured for the request host", body = crate::documentation::ErrorResponse),
        (status = 500, description = "Evaluator failure", body = CheckResponse)
    )
)]
/// Checks one intercepted request against the configuration of the API it
/// targets.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CheckRequestBody>,
) -> Result<(StatusCode, Json<CheckResponse>), AppError> {
    let request = CheckRequest {
        attributes: body.attributes,
    };
    let host = request.attributes.request.http.host.clone();

    let api = state
        .apis
        .get(&host)
        .cloned()
        .ok_or_else(|| AppError::UnknownHost { host: host.clone() })?;

    // The scope outlives the check only to be cancelled; a detached timer
    // enforces the configured deadline through it.
    let scope = CancellationToken::new();
    if !state.check_timeout.is_zero() {
        let deadline = state.check_timeout;
        let timer = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            timer.cancel();
        });
    }

    let pipeline = AuthPipeline::new(scope, request, api);
    let response = match pipeline.evaluate().await {
        Ok(()) => CheckResponse::allowed(),
        Err(error) => CheckResponse::denied(&error),
    };

    tracing::info!(
        host = %host,
        status = ?response.status,
        reason = response.reason.as_deref().unwrap_or(""),
        "check evaluated"
    );

    Ok((response.status.http_status(), Json(response)))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthCheckResponse)
    )
)]
pub async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
