mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use ragward_index::{AccessPolicy, IndexerConfig, RetrievalConfig, WatcherConfig};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be greater than 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }
        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be greater than 0");
        }
        if self.search.limit == 0 {
            bail!("search.limit must be greater than 0");
        }
        if self.watcher.queue_capacity == 0 {
            bail!("watcher.queue_capacity must be greater than 0");
        }
        if self.documents.sideload_concurrency == 0 {
            bail!("documents.sideload_concurrency must be greater than 0");
        }
        if self.documents.extension.is_empty() || self.documents.extension.starts_with('.') {
            bail!("documents.extension must be a bare extension such as \"txt\"");
        }
        if self.store.collection.trim().is_empty() {
            bail!("store.collection must not be empty");
        }
        self.access_policy()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if an access rule is malformed or an identity repeats.
    pub fn access_policy(&self) -> anyhow::Result<AccessPolicy> {
        AccessPolicy::from_rules(&self.access.rules).context("invalid access rules")
    }

    #[must_use]
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            collection: self.store.collection.clone(),
            extension: self.documents.extension.clone(),
            chunk_size: self.chunking.chunk_size,
            chunk_overlap: self.chunking.chunk_overlap,
            sideload_concurrency: self.documents.sideload_concurrency,
        }
    }

    #[must_use]
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            collection: self.store.collection.clone(),
            limit: self.search.limit,
        }
    }

    #[must_use]
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            debounce: Duration::from_millis(self.watcher.debounce_ms),
            queue_capacity: self.watcher.queue_capacity,
        }
    }
}
