use std::future::Future;

use crate::error::LlmError;

/// Converts text into fixed-dimension vectors for similarity search.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or returns no vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed many texts in one request. The output preserves input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or returns a different number of vectors.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    fn name(&self) -> &str;
}
