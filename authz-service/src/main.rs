use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utoipa::OpenApi;

use authz_service::models::AppState;
use authz_service::{app, config, ApiDoc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::AppConfig::from_env();

    let api_path = std::env::var("API_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/apis.json")));
    let apis = config::load_api_configs(&api_path)?;
    tracing::info!(apis = apis.len(), "API configurations loaded");

    let state = Arc::new(AppState {
        apis,
        check_timeout: cfg.check_timeout,
    });

    let openapi = ApiDoc::openapi();
    let app = app(state).route(
        "/openapi.json",
        axum::routing::get(move || async { axum::Json(openapi) }),
    );

    let listener = TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!("authz-service listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
