use thiserror::Error;

#[derive(Debug, Error)]
pub enum GaleError {
    #[error("model config {key}: required field {field} is unset")]
    MissingField { key: String, field: &'static str },

    #[error("model config {key}: {reason}")]
    InvalidModelConfig { key: String, reason: String },

    #[error("duplicate model key: {key}")]
    DuplicateModel { key: String },

    #[error("model not found: {key}")]
    ModelNotFound { key: String },

    #[error("active plan not found for plan {plan_id} branch {branch}")]
    PlanNotFound { plan_id: String, branch: String },

    #[error("cancelled")]
    Cancelled,

    #[error("model request failed: {message}")]
    Transport { message: String },

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),
}

impl GaleError {
    /// Returns true for failures the build attempt retries locally.
    /// Only extraction failures qualify: transport errors already went
    /// through the client's own retry layer, and cancellation and a missing
    /// plan are always terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Extraction(_))
    }

    /// Returns true if the caller's context was cancelled. Callers use this
    /// to distinguish "the user stopped this" from "this failed".
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
