#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, future_incompatible)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

//! Request evaluation core of the external authorization service.
//!
//! Every check request runs through an [`AuthPipeline`] built from the
//! [`ApiConfig`] resolved for the requested API. The pipeline evaluates
//! three phases in order, identity, metadata and authorization, fanning the
//! evaluators of each phase out concurrently under a completion strategy.
//! Resolved objects accumulate in per-phase maps and feed the dynamic
//! authorization context that authorization evaluators query through
//! dot-path selectors.

pub mod credentials;
pub mod error;
pub mod evaluator;
pub mod evaluators;
pub mod json;
pub mod pipeline;
pub mod request;
pub mod runner;

pub use credentials::{CredentialLocation, CredentialSource};
pub use error::{EvaluationError, PipelineError};
pub use evaluator::{EvaluationResponse, Evaluator, PipelineView};
pub use json::{PatternMatchingRule, PatternOperator};
pub use pipeline::{ApiConfig, AuthPipeline};
pub use request::{AttributeContext, CheckRequest, HttpRequest};
pub use runner::EvaluationStrategy;
