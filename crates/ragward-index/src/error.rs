//! Error types for ragward-index.

use std::num::TryFromIntError;

/// Errors that can occur while indexing or searching documents.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Search was called with an empty or whitespace-only query.
    #[error("query is required")]
    EmptyQuery,

    /// IO error reading a document or listing the documents directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding provider error.
    #[error("embedding error: {0}")]
    Llm(#[from] ragward_llm::LlmError),

    /// Vector store error.
    #[error("vector store error: {0}")]
    Store(#[from] ragward_store::VectorStoreError),

    /// The embedder returned a different number of vectors than chunks sent.
    #[error("embedding count mismatch: expected {expected}, got {actual}")]
    EmbeddingMismatch { expected: usize, actual: usize },

    /// Invalid splitter or access-policy settings.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// File watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("integer conversion failed: {0}")]
    IntConversion(#[from] TryFromIntError),
}

impl IndexError {
    /// Whether the error was caused by caller input rather than a backend failure.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::EmptyQuery)
    }
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
