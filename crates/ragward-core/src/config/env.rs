use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_documents();
        self.apply_env_overrides_services();
    }

    fn apply_env_overrides_documents(&mut self) {
        if let Ok(v) = std::env::var("RAGWARD_DOCUMENTS_DIR") {
            self.documents.dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RAGWARD_SEED_SAMPLES")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.documents.seed_samples = enabled;
        }
        if let Ok(v) = std::env::var("RAGWARD_CHUNK_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.chunking.chunk_size = size;
        }
        if let Ok(v) = std::env::var("RAGWARD_CHUNK_OVERLAP")
            && let Ok(overlap) = v.parse::<usize>()
        {
            self.chunking.chunk_overlap = overlap;
        }
        if let Ok(v) = std::env::var("RAGWARD_WATCHER_ENABLED")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.watcher.enabled = enabled;
        }
    }

    fn apply_env_overrides_services(&mut self) {
        if let Ok(v) = std::env::var("RAGWARD_OLLAMA_HOST") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("RAGWARD_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("RAGWARD_EMBEDDING_TIMEOUT")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.embedding.timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("RAGWARD_EMBEDDING_MAX_RETRIES")
            && let Ok(retries) = v.parse::<u32>()
        {
            self.embedding.max_retries = retries;
        }
        if let Ok(v) = std::env::var("RAGWARD_STORE_BACKEND") {
            if let Ok(backend) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.store.backend = backend;
            } else {
                tracing::warn!("ignoring invalid RAGWARD_STORE_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGWARD_QDRANT_URL") {
            self.store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("RAGWARD_COLLECTION") {
            self.store.collection = v;
        }
        if let Ok(v) = std::env::var("RAGWARD_SEARCH_LIMIT")
            && let Ok(limit) = v.parse::<u64>()
        {
            self.search.limit = limit;
        }
        if let Ok(v) = std::env::var("RAGWARD_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("RAGWARD_GATEWAY_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.gateway.port = port;
        }
    }
}
