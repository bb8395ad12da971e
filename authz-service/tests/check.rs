//! End-to-end checks against a served instance: credential verification,
//! pattern-matching denial, host resolution and metadata callouts.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use authz_core::evaluators::{ApiKeyIdentity, HttpMetadata, HttpMethod, PatternMatching};
use authz_core::{ApiConfig, CredentialSource, PatternMatchingRule, PatternOperator};
use authz_service::models::{AppState, CheckResponse, CheckStatus};
use authz_service::{app, config};

async fn serve(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app(Arc::new(state));
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

async fn serve_shipped_configuration() -> SocketAddr {
    let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/apis.json"));
    let apis = config::load_api_configs(path).unwrap();
    serve(AppState {
        apis,
        check_timeout: Duration::from_secs(5),
    })
    .await
}

fn check_body(host: &str, method: &str, path: &str, headers: &[(&str, &str)]) -> serde_json::Value {
    let headers: HashMap<&str, &str> = headers.iter().copied().collect();
    json!({
        "attributes": {
            "source": {"address": "10.0.0.1:52318"},
            "request": {
                "http": {
                    "id": "1",
                    "method": method,
                    "host": host,
                    "path": path,
                    "scheme": "http",
                    "headers": headers,
                }
            }
        }
    })
}

async fn post_check(addr: SocketAddr, body: &serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/v1/check"))
        .json(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn known_api_key_is_allowed() {
    let addr = serve_shipped_configuration().await;

    let body = check_body(
        "echo-api.example.com",
        "GET",
        "/resource",
        &[("authorization", "APIKEY ndyRzGmgzwK8TzAjVjipCQAy")],
    );
    let response = post_check(addr, &body).await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let check: CheckResponse = response.json().await.unwrap();
    assert_eq!(check.status, CheckStatus::Ok);
    assert!(check.reason.is_none());
}

#[tokio::test]
async fn unknown_api_key_is_unauthenticated() {
    let addr = serve_shipped_configuration().await;

    let body = check_body(
        "echo-api.example.com",
        "GET",
        "/resource",
        &[("authorization", "APIKEY not-a-friend")],
    );
    let response = post_check(addr, &body).await;

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let check: CheckResponse = response.json().await.unwrap();
    assert_eq!(check.status, CheckStatus::Unauthenticated);
    assert!(check.reason.unwrap().contains("API key"));
}

#[tokio::test]
async fn missing_credential_is_unauthenticated() {
    let addr = serve_shipped_configuration().await;

    let body = check_body("echo-api.example.com", "GET", "/resource", &[]);
    let response = post_check(addr, &body).await;

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let check: CheckResponse = response.json().await.unwrap();
    assert_eq!(check.status, CheckStatus::Unauthenticated);
}

#[tokio::test]
async fn policy_violation_is_denied() {
    let addr = serve_shipped_configuration().await;

    let body = check_body(
        "echo-api.example.com",
        "DELETE",
        "/resource",
        &[("authorization", "APIKEY ndyRzGmgzwK8TzAjVjipCQAy")],
    );
    let response = post_check(addr, &body).await;

    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    let check: CheckResponse = response.json().await.unwrap();
    assert_eq!(check.status, CheckStatus::PermissionDenied);
    assert!(check.reason.unwrap().contains("Unauthorized"));
}

#[tokio::test]
async fn unknown_host_is_not_found() {
    let addr = serve_shipped_configuration().await;

    let body = check_body("unknown.example.com", "GET", "/resource", &[]);
    let response = post_check(addr, &body).await;

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let error: serde_json::Value = response.json().await.unwrap();
    assert_eq!(error["error"]["type"], "unknown_host");
    assert_eq!(error["error"]["status"], 404);
}

#[tokio::test]
async fn metadata_callout_feeds_authorization_rules() {
    // Stub metadata endpoint answering with a fixed document.
    let metadata_listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let metadata_addr = metadata_listener.local_addr().unwrap();
    let metadata_app =
        Router::new().route("/geo", get(|| async { Json(json!({"country": "ES"})) }));
    tokio::spawn(async move { axum::serve(metadata_listener, metadata_app).await.unwrap() });

    let geo_rule = |value: &str| PatternMatchingRule {
        selector: "auth.metadata.geo.country".to_string(),
        operator: PatternOperator::Eq,
        value: value.to_string(),
    };

    let api_for = |expected: &str| {
        Arc::new(ApiConfig {
            identity: vec![Arc::new(ApiKeyIdentity::new(
                "friends",
                CredentialSource::default(),
                ["k".to_string()],
            ))],
            metadata: vec![Arc::new(HttpMetadata::new(
                "geo",
                format!("http://{metadata_addr}/geo"),
                HttpMethod::Get,
            ))],
            authorization: vec![Arc::new(PatternMatching::new(
                "geo-fence",
                vec![geo_rule(expected)],
            ))],
        })
    };

    let apis = HashMap::from([
        ("inside.example.com".to_string(), api_for("ES")),
        ("outside.example.com".to_string(), api_for("FR")),
    ]);
    let addr = serve(AppState {
        apis,
        check_timeout: Duration::from_secs(5),
    })
    .await;

    let allowed = post_check(
        addr,
        &check_body(
            "inside.example.com",
            "GET",
            "/resource",
            &[("authorization", "Bearer k")],
        ),
    )
    .await;
    assert_eq!(allowed.status(), reqwest::StatusCode::OK);

    let denied = post_check(
        addr,
        &check_body(
            "outside.example.com",
            "GET",
            "/resource",
            &[("authorization", "Bearer k")],
        ),
    )
    .await;
    assert_eq!(denied.status(), reqwest::StatusCode::FORBIDDEN);
}
