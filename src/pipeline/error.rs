//! Error types for normalization and the fit/transform pipeline.
//!
//! `NormalizationError` is local and recoverable: callers resolve it to the
//! `Missing` marker and count it. `PipelineError` is fatal for the operation
//! that raised it.

use thiserror::Error;

/// A single raw value that could not be normalized for its field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    /// The raw token cannot be read as the type the field expects.
    #[error("field '{field}': cannot parse '{raw}' as a {expected}")]
    MalformedValue {
        field: String,
        raw: String,
        expected: &'static str,
    },

    /// A numeric value outside every declared band or bound that is not a sentinel.
    #[error("field '{field}': code {code} is outside every declared range")]
    OutOfDomainCode { field: String, code: f64 },

    /// The field has no rule in the registry.
    #[error("field '{field}' is not registered")]
    UnregisteredField { field: String },
}

/// Fatal pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Fitted artifacts are absent, truncated, stale or inconsistent with the
    /// registry. Transform-only mode refuses to emit a vector.
    #[error("artifact '{artifact}' is unusable: {reason}")]
    SchemaMismatch { artifact: String, reason: String },

    #[error("outcome field '{0}' is not registered")]
    UnknownTarget(String),

    #[error("field '{0}' is registered but is not an outcome field")]
    NotATarget(String),

    #[error("invalid field rule table: {0}")]
    InvalidRegistry(String),

    #[error("input corpus contains no rows")]
    EmptyCorpus,

    #[error("all {rows} row(s) were excluded by outcome derivation")]
    NoTrainingRows { rows: usize },

    #[error("input header contains no registered feature field")]
    NoFeatureFields,

    #[error("input header contains no registered outcome field")]
    NoOutcomeFields,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn mismatch(artifact: &str, reason: impl Into<String>) -> Self {
        PipelineError::SchemaMismatch {
            artifact: artifact.to_string(),
            reason: reason.into(),
        }
    }
}
