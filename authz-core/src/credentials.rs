//! Extraction of bearer-style secrets from a checked HTTP request.
//!
//! A [`CredentialSource`] names one of four request locations and the key
//! that selects the credential within it. Identity evaluators run the
//! extraction before verifying whatever secret comes out.

use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::request::HttpRequest;

/// Key selector applied when none is configured.
pub const DEFAULT_KEY_SELECTOR: &str = "Bearer";

/// Where in the request the credential is looked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialLocation {
    /// The `Authorization` header, prefixed by the key selector.
    #[default]
    AuthorizationHeader,
    /// A header named after the key selector.
    CustomHeader,
    /// A cookie named after the key selector.
    Cookie,
    /// A query-string parameter named after the key selector.
    Query,
}

impl FromStr for CredentialLocation {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_header" => Ok(Self::AuthorizationHeader),
            "custom_header" => Ok(Self::CustomHeader),
            "cookie" => Ok(Self::Cookie),
            "query" => Ok(Self::Query),
            other => Err(EvaluationError::UnsupportedCredentialLocation(
                other.to_string(),
            )),
        }
    }
}

/// Locator configuration of one identity evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSource {
    pub key_selector: String,
    pub location: CredentialLocation,
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self {
            key_selector: DEFAULT_KEY_SELECTOR.to_string(),
            location: CredentialLocation::default(),
        }
    }
}

impl CredentialSource {
    /// Builds a locator from configuration strings, falling back to the
    /// defaults (`Bearer` in the authorization header) for empty values.
    pub fn new(key_selector: &str, location: &str) -> Result<Self, EvaluationError> {
        let key_selector = if key_selector.is_empty() {
            DEFAULT_KEY_SELECTOR.to_string()
        } else {
            key_selector.to_string()
        };
        let location = if location.is_empty() {
            CredentialLocation::default()
        } else {
            location.parse()?
        };
        Ok(Self {
            key_selector,
            location,
        })
    }

    /// Extracts the credential from the configured location.
    pub fn extract(&self, request: &HttpRequest) -> Result<String, EvaluationError> {
        match self.location {
            CredentialLocation::AuthorizationHeader => self.from_authorization_header(request),
            CredentialLocation::CustomHeader => self.from_custom_header(request),
            CredentialLocation::Cookie => self.from_cookie(request),
            CredentialLocation::Query => self.from_query(request),
        }
    }

    fn from_authorization_header(&self, request: &HttpRequest) -> Result<String, EvaluationError> {
        let header = request
            .header("authorization")
            .ok_or(EvaluationError::CredentialNotFound)?;
        let prefix = format!("{} ", self.key_selector);
        header
            .strip_prefix(&prefix)
            .map(str::to_string)
            .ok_or(EvaluationError::CredentialNotFound)
    }

    fn from_custom_header(&self, request: &HttpRequest) -> Result<String, EvaluationError> {
        request
            .header(&self.key_selector)
            .map(str::to_string)
            .ok_or(EvaluationError::CredentialNotFound)
    }

    fn from_cookie(&self, request: &HttpRequest) -> Result<String, EvaluationError> {
        let header = request
            .header("cookie")
            .ok_or(EvaluationError::CredentialNotFound)?;
        for part in header.split(';') {
            // Cookie values may themselves contain '='; only the first one
            // separates the name.
            if let Some((name, value)) = part.trim().split_once('=') {
                if name == self.key_selector {
                    return Ok(value.to_string());
                }
            }
        }
        Err(EvaluationError::CredentialNotFound)
    }

    fn from_query(&self, request: &HttpRequest) -> Result<String, EvaluationError> {
        let pattern = format!("[?&]{}=([^&]*)", regex::escape(&self.key_selector));
        let regex = Regex::new(&pattern)?;
        regex
            .captures(&request.path)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().to_string())
            .ok_or(EvaluationError::CredentialNotFound)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn request_with_headers(headers: &[(&str, &str)]) -> HttpRequest {
        HttpRequest {
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            ..HttpRequest::default()
        }
    }

    fn request_with_path(path: &str) -> HttpRequest {
        HttpRequest {
            path: path.to_string(),
            headers: HashMap::new(),
            ..HttpRequest::default()
        }
    }

    #[test]
    fn bearer_token_from_authorization_header() {
        let source = CredentialSource::default();
        let request = request_with_headers(&[("authorization", "Bearer abc")]);
        assert_eq!(source.extract(&request).unwrap(), "abc");
    }

    #[test]
    fn missing_authorization_header_is_not_found() {
        let source = CredentialSource::default();
        let request = request_with_headers(&[]);
        assert!(matches!(
            source.extract(&request),
            Err(EvaluationError::CredentialNotFound)
        ));
    }

    #[test]
    fn wrong_prefix_is_not_found() {
        let source = CredentialSource::default();
        let request = request_with_headers(&[("authorization", "Basic abc")]);
        assert!(matches!(
            source.extract(&request),
            Err(EvaluationError::CredentialNotFound)
        ));
    }

    #[test]
    fn custom_header_is_looked_up_lower_cased() {
        let source = CredentialSource::new("X-API-Key", "custom_header").unwrap();
        let request = request_with_headers(&[("x-api-key", "k")]);
        assert_eq!(source.extract(&request).unwrap(), "k");
    }

    #[test]
    fn cookie_value_by_name() {
        let source = CredentialSource::new("token", "cookie").unwrap();
        let request = request_with_headers(&[("cookie", "a=1; token=xyz; b=2")]);
        assert_eq!(source.extract(&request).unwrap(), "xyz");
    }

    #[test]
    fn cookie_value_keeps_embedded_equals() {
        let source = CredentialSource::new("token", "cookie").unwrap();
        let request = request_with_headers(&[("cookie", "token=xyz=tail")]);
        assert_eq!(source.extract(&request).unwrap(), "xyz=tail");
    }

    #[test]
    fn absent_cookie_is_not_found() {
        let source = CredentialSource::new("token", "cookie").unwrap();
        let request = request_with_headers(&[("cookie", "a=1; b=2")]);
        assert!(matches!(
            source.extract(&request),
            Err(EvaluationError::CredentialNotFound)
        ));
    }

    #[test]
    fn query_parameter_between_others() {
        let source = CredentialSource::new("token", "query").unwrap();
        let request = request_with_path("/p?foo=1&token=xyz&bar=2");
        assert_eq!(source.extract(&request).unwrap(), "xyz");
    }

    #[test]
    fn query_parameter_as_first_and_last() {
        let source = CredentialSource::new("token", "query").unwrap();
        assert_eq!(
            source.extract(&request_with_path("/p?token=xyz")).unwrap(),
            "xyz"
        );
        assert_eq!(
            source
                .extract(&request_with_path("/p?foo=1&token=xyz"))
                .unwrap(),
            "xyz"
        );
    }

    #[test]
    fn absent_query_parameter_is_not_found() {
        let source = CredentialSource::new("token", "query").unwrap();
        let request = request_with_path("/p?foo=1&bar=2");
        assert!(matches!(
            source.extract(&request),
            Err(EvaluationError::CredentialNotFound)
        ));
    }

    #[test]
    fn empty_configuration_falls_back_to_defaults() {
        let source = CredentialSource::new("", "").unwrap();
        assert_eq!(source.key_selector, DEFAULT_KEY_SELECTOR);
        assert_eq!(source.location, CredentialLocation::AuthorizationHeader);
    }

    #[test]
    fn unsupported_location_is_rejected() {
        let error = CredentialSource::new("Bearer", "body").unwrap_err();
        assert!(matches!(
            error,
            EvaluationError::UnsupportedCredentialLocation(ref location) if location == "body"
        ));
    }
}
