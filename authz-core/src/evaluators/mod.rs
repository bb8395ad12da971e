//! Concrete evaluator implementations shipped with the service.

mod api_key;
mod http_metadata;
mod pattern_matching;

pub use api_key::ApiKeyIdentity;
pub use http_metadata::{HttpMetadata, HttpMethod};
pub use pattern_matching::PatternMatching;
