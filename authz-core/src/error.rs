use thiserror::Error;

/// Failure reported by a single evaluator or by the machinery running it.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// No credential could be extracted from the request.
    #[error("credential not found")]
    CredentialNotFound,

    /// The configured credential location is not a supported one.
    #[error("the credential location is not supported: {0}")]
    UnsupportedCredentialLocation(String),

    /// Opaque evaluator failure carrying a short cause.
    #[error("{0}")]
    Failure(String),

    /// The evaluation scope was cancelled before the evaluator finished.
    #[error("evaluation cancelled")]
    Cancelled,

    /// Semantic denial from an authorization evaluator.
    #[error("Unauthorized")]
    Unauthorized,

    /// A `matches` pattern failed to compile. Surfaced verbatim.
    #[error(transparent)]
    InvalidRegex(#[from] regex::Error),

    /// No identity evaluator is configured for the requested API.
    #[error("no identity evaluator configured")]
    NoIdentityEvaluator,
}

/// Pipeline failure tagged with the phase that produced it, so that the
/// response layer can tell an authentication failure from a denial.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The identity phase ended without a resolved identity.
    #[error("identity verification failed: {0}")]
    Identity(EvaluationError),

    /// An authorization evaluator denied the request or failed.
    #[error("authorization failed: {0}")]
    Authorization(EvaluationError),
}

impl PipelineError {
    /// The evaluator error behind the failed phase.
    #[must_use]
    pub fn cause(&self) -> &EvaluationError {
        match self {
            Self::Identity(error) | Self::Authorization(error) => error,
        }
    }
}
