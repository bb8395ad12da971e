//! Service configuration: bind address and check deadline from the
//! environment, API configurations from a JSON document.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use authz_core::evaluators::{ApiKeyIdentity, HttpMetadata, HttpMethod, PatternMatching};
use authz_core::{ApiConfig, CredentialSource, PatternMatchingRule};

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub check_timeout: Duration,
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8003);

        let host: IpAddr = std::env::var("HOST")
            .ok()
            .and_then(|s| {
                s.parse()
                    .map_err(|e| {
                        tracing::warn!("Invalid HOST value '{}': {}", s, e);
                        e
                    })
                    .ok()
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let check_timeout = std::env::var("CHECK_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(Duration::from_secs(5), Duration::from_millis);

        tracing::info!("Configuration loaded: {}:{}", host, port);

        Self {
            bind_addr: SocketAddr::new(host, port),
            check_timeout,
        }
    }
}

/// Identity entry of an API document.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IdentitySpec {
    ApiKey {
        name: String,
        #[serde(default)]
        credentials: CredentialSpec,
        keys: Vec<String>,
    },
}

/// Credential locator entry, in the configuration vocabulary: empty values
/// fall back to `Bearer` in the authorization header.
#[derive(Debug, Default, Deserialize)]
struct CredentialSpec {
    #[serde(default)]
    key_selector: String,
    #[serde(default, rename = "in")]
    location: String,
}

/// Metadata entry of an API document.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MetadataSpec {
    Http {
        name: String,
        endpoint: String,
        #[serde(default)]
        method: HttpMethod,
    },
}

/// Authorization entry of an API document.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AuthorizationSpec {
    PatternMatching {
        name: String,
        #[serde(default)]
        rules: Vec<PatternMatchingRule>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ApiSpec {
    #[serde(default)]
    identity: Vec<IdentitySpec>,
    #[serde(default)]
    metadata: Vec<MetadataSpec>,
    #[serde(default)]
    authorization: Vec<AuthorizationSpec>,
}

/// Loads the host-keyed API configurations from a JSON document.
pub fn load_api_configs(path: &Path) -> Result<HashMap<String, Arc<ApiConfig>>, AppError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("failed to read {}: {e}", path.display())))?;
    let specs: HashMap<String, ApiSpec> = serde_json::from_str(&raw)
        .map_err(|e| AppError::config(format!("failed to parse {}: {e}", path.display())))?;

    specs
        .into_iter()
        .map(|(host, spec)| Ok((host, Arc::new(build_api(spec)?))))
        .collect()
}

fn build_api(spec: ApiSpec) -> Result<ApiConfig, AppError> {
    let mut api = ApiConfig::default();

    for identity in spec.identity {
        match identity {
            IdentitySpec::ApiKey {
                name,
                credentials,
                keys,
            } => {
                let source =
                    CredentialSource::new(&credentials.key_selector, &credentials.location)
                        .map_err(|e| AppError::config(e.to_string()))?;
                api.identity
                    .push(Arc::new(ApiKeyIdentity::new(name, source, keys)));
            }
        }
    }

    for metadata in spec.metadata {
        match metadata {
            MetadataSpec::Http {
                name,
                endpoint,
                method,
            } => {
                api.metadata
                    .push(Arc::new(HttpMetadata::new(name, endpoint, method)));
            }
        }
    }

    for authorization in spec.authorization {
        match authorization {
            AuthorizationSpec::PatternMatching { name, rules } => {
                api.authorization
                    .push(Arc::new(PatternMatching::new(name, rules)));
            }
        }
    }

    Ok(api)
}

#[cfg(test)]
mod tests {
    use authz_core::Evaluator;

    use super::*;

    #[test]
    fn api_document_builds_evaluator_lists() {
        let raw = serde_json::json!({
            "echo-api.example.com": {
                "identity": [{
                    "type": "api_key",
                    "name": "friends",
                    "credentials": {"key_selector": "APIKEY", "in": "authorization_header"},
                    "keys": ["secret"],
                }],
                "metadata": [{
                    "type": "http",
                    "name": "geo",
                    "endpoint": "http://127.0.0.1:9090/geo",
                    "method": "GET",
                }],
                "authorization": [{
                    "type": "pattern_matching",
                    "name": "edge-only",
                    "rules": [{
                        "selector": "context.request.http.method",
                        "operator": "neq",
                        "value": "DELETE",
                    }],
                }],
            }
        });

        let spec: HashMap<String, ApiSpec> = serde_json::from_value(raw).unwrap();
        let api = build_api(spec.into_values().next().unwrap()).unwrap();
        assert_eq!(api.identity.len(), 1);
        assert_eq!(api.metadata.len(), 1);
        assert_eq!(api.authorization.len(), 1);
        assert_eq!(api.identity[0].name(), "friends");
    }

    #[test]
    fn unsupported_credential_location_is_a_config_error() {
        let spec = ApiSpec {
            identity: vec![IdentitySpec::ApiKey {
                name: "friends".to_string(),
                credentials: CredentialSpec {
                    key_selector: String::new(),
                    location: "body".to_string(),
                },
                keys: vec!["secret".to_string()],
            }],
            ..ApiSpec::default()
        };

        let error = build_api(spec).unwrap_err();
        assert!(error.to_string().contains("not supported"));
    }
}
