use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("expected {expected} embeddings, got {actual}")]
    BatchMismatch { expected: usize, actual: usize },

    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Whether a retry of the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
