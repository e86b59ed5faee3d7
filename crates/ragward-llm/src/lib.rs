//! Embedding provider abstraction with an Ollama backend.

pub mod any;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod provider;
pub mod retry;

pub use error::LlmError;
pub use provider::EmbeddingProvider;
pub use retry::{EmbedPolicy, Resilient};
