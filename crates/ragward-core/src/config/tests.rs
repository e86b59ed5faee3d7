use std::io::Write;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 15] = [
    "RAGWARD_DOCUMENTS_DIR",
    "RAGWARD_SEED_SAMPLES",
    "RAGWARD_CHUNK_SIZE",
    "RAGWARD_CHUNK_OVERLAP",
    "RAGWARD_OLLAMA_HOST",
    "RAGWARD_EMBEDDING_MODEL",
    "RAGWARD_EMBEDDING_TIMEOUT",
    "RAGWARD_EMBEDDING_MAX_RETRIES",
    "RAGWARD_STORE_BACKEND",
    "RAGWARD_QDRANT_URL",
    "RAGWARD_COLLECTION",
    "RAGWARD_SEARCH_LIMIT",
    "RAGWARD_WATCHER_ENABLED",
    "RAGWARD_GATEWAY_BIND",
    "RAGWARD_GATEWAY_PORT",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn defaults_when_file_missing() {
    clear_env();
    let config = Config::load(Path::new("/nonexistent/ragward.toml")).unwrap();

    assert_eq!(config.documents.dir, Path::new("./documents"));
    assert_eq!(config.documents.extension, "txt");
    assert!(config.documents.seed_samples);
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.chunk_overlap, 200);
    assert_eq!(config.embedding.base_url, "http://localhost:11434");
    assert_eq!(config.embedding.model, "nomic-embed-text");
    assert_eq!(config.embedding.timeout_secs, 30);
    assert_eq!(config.store.backend, StoreBackend::Qdrant);
    assert_eq!(config.store.collection, "llm_documents_collection");
    assert_eq!(config.search.limit, 5);
    assert!(config.watcher.enabled);
    assert_eq!(config.gateway.port, 5000);
    assert_eq!(config.gateway.max_body_size, 1_048_576);
    assert_eq!(config.access.rules.len(), 2);
    config.validate().unwrap();
}

#[test]
#[serial]
fn parse_partial_toml_keeps_defaults() {
    clear_env();
    let file = write_config(
        r#"
[chunking]
chunk_size = 500

[store]
backend = "memory"

[gateway]
port = 8080
"#,
    );
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.chunking.chunk_size, 500);
    assert_eq!(config.chunking.chunk_overlap, 200);
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.store.qdrant_url, "http://localhost:6334");
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bind, "127.0.0.1");
}

#[test]
#[serial]
fn access_rules_from_toml_replace_defaults() {
    clear_env();
    let file = write_config(
        r#"
[[access.rules]]
identity = "Lambik"
status = "draft"

[[access.rules]]
identity = "Jerom"
unrestricted = true
"#,
    );
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.access.rules.len(), 2);
    assert_eq!(config.access.rules[0].identity, "Lambik");

    let policy = config.access_policy().unwrap();
    assert!(policy.resolve(Some("Jerom")).is_none());
    assert!(policy.resolve(Some("Wiske")).is_some());
}

#[test]
#[serial]
fn invalid_toml_is_an_error() {
    clear_env();
    let file = write_config("[chunking\nchunk_size = ");
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let file = write_config("[search]\nlimit = 3\n");
    unsafe {
        std::env::set_var("RAGWARD_SEARCH_LIMIT", "9");
        std::env::set_var("RAGWARD_DOCUMENTS_DIR", "/srv/docs");
        std::env::set_var("RAGWARD_OLLAMA_HOST", "http://ollama:11434");
        std::env::set_var("RAGWARD_STORE_BACKEND", "memory");
        std::env::set_var("RAGWARD_WATCHER_ENABLED", "false");
        std::env::set_var("RAGWARD_GATEWAY_PORT", "5050");
    }
    let config = Config::load(file.path()).unwrap();
    clear_env();

    assert_eq!(config.search.limit, 9);
    assert_eq!(config.documents.dir, Path::new("/srv/docs"));
    assert_eq!(config.embedding.base_url, "http://ollama:11434");
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert!(!config.watcher.enabled);
    assert_eq!(config.gateway.port, 5050);
}

#[test]
#[serial]
fn unparsable_env_values_are_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("RAGWARD_CHUNK_SIZE", "big");
        std::env::set_var("RAGWARD_STORE_BACKEND", "chroma");
        std::env::set_var("RAGWARD_GATEWAY_PORT", "99999");
    }
    let config = Config::load(Path::new("/nonexistent/ragward.toml")).unwrap();
    clear_env();

    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.store.backend, StoreBackend::Qdrant);
    assert_eq!(config.gateway.port, 5000);
}

#[test]
fn validate_rejects_overlap_not_below_size() {
    let mut config = Config::default();
    config.chunking.chunk_overlap = config.chunking.chunk_size;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_values() {
    let mut config = Config::default();
    config.chunking.chunk_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.search.limit = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.watcher.queue_capacity = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_embedding_timeout() {
    let mut config = Config::default();
    config.embedding.timeout_secs = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("embedding.timeout_secs"));

    config.embedding.timeout_secs = 1;
    assert!(config.validate().is_ok());
}

#[test]
fn validate_rejects_duplicate_identities() {
    let mut config = Config::default();
    config.access.rules.push(config.access.rules[0].clone());
    let err = config.validate().unwrap_err();
    assert!(format!("{err:#}").contains("duplicate access rule"));
}

#[test]
fn validate_rejects_dotted_extension() {
    let mut config = Config::default();
    config.documents.extension = ".txt".into();
    assert!(config.validate().is_err());
}

#[test]
fn derived_component_configs() {
    let mut config = Config::default();
    config.store.collection = "docs".into();
    config.watcher.debounce_ms = 250;

    assert_eq!(config.indexer_config().collection, "docs");
    assert_eq!(config.indexer_config().chunk_size, 1000);
    assert_eq!(config.retrieval_config().limit, 5);
    assert_eq!(
        config.watcher_config().debounce,
        Duration::from_millis(250)
    );
}
