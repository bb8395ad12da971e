#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, future_incompatible)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

//! HTTP surface of the external authorization service.
//!
//! `POST /v1/check` receives the attribute tree of a request intercepted by
//! the proxy, resolves the configuration of the API it targets by host and
//! runs the evaluation pipeline against it. The response carries the check
//! outcome for the proxy to enforce.

use std::sync::Arc;

use axum::http;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod config;
mod documentation;
pub mod errors;
pub mod handlers;
pub mod models;

pub use documentation::ApiDoc;
pub use models::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = match std::env::var("ALLOWED_ORIGINS") {
        Ok(origins) if !origins.trim().is_empty() => {
            let mut layer = CorsLayer::new();
            for origin in origins.split(',') {
                if let Ok(origin) = origin.trim().parse::<http::HeaderValue>() {
                    layer = layer.allow_origin(origin);
                }
            }
            layer
        }
        // No origins unless explicitly configured.
        _ => CorsLayer::new(),
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/check", post(handlers::check))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
