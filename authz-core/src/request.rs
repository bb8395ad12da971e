//! The attribute tree of a request under check.
//!
//! This is the read-only view the proxy hands over for every check call,
//! reduced to the attributes the pipeline consumes. It serializes as-is
//! under the `context` key of the authorization context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One check request as delivered by the proxy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckRequest {
    pub attributes: AttributeContext,
}

/// Attributes of the request being checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Peer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Peer>,
    #[serde(default)]
    pub request: RequestAttributes,
}

/// A network peer of the checked connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Peer {
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestAttributes {
    #[serde(default)]
    pub http: HttpRequest,
}

/// The HTTP attributes of the checked request.
///
/// Header names arrive lower-cased from the proxy; `path` carries the query
/// string when one is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

impl HttpRequest {
    /// Looks up a header by name, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}
