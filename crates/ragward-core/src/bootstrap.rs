//! Application bootstrap: config resolution, documents directory, service construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ragward_index::{DocumentIndexer, DocumentRetriever, XattrReader, document::fields};
use ragward_llm::any::AnyEmbedder;
use ragward_llm::ollama::OllamaEmbedder;
use ragward_llm::provider::EmbeddingProvider;
use ragward_llm::{EmbedPolicy, Resilient};
use ragward_store::{InMemoryVectorStore, QdrantStore, VectorStore};

use crate::config::{Config, EmbeddingConfig, StoreBackend, StoreConfig};

/// Documents written into an empty documents directory on first start.
pub const SAMPLE_DOCUMENTS: [(&str, &str); 8] = [
    (
        "security_policy.txt",
        "This document outlines the final security policies and procedures approved by the security group. It covers access control, data encryption, and incident response. All personnel must adhere to these guidelines.",
    ),
    (
        "privacy_policy_draft.txt",
        "This is a draft version of the privacy policy. It addresses data collection, usage, and user rights. This version is still under review by the legal team.",
    ),
    (
        "old_hr_policy.txt",
        "This is an obsolete HR policy regarding remote work prior to 2020. A new policy was issued last year.",
    ),
    (
        "marketing_brief_final.txt",
        "This is the final marketing brief for the Q3 campaign, approved by the marketing team. It details target audience and messaging.",
    ),
    (
        "it_security_guidelines.txt",
        "These are the final IT security guidelines for server configuration and network hardening, approved by the security group. Adherence is mandatory.",
    ),
    (
        "new_feature_spec_draft.txt",
        "This is a draft specification for the new 'User Dashboard' feature. It's currently being reviewed by the engineering team.",
    ),
    (
        "compliance_report_final.txt",
        "This is the final annual compliance report, approved by the compliance department. It summarizes audit findings and regulatory adherence.",
    ),
    (
        "wiske_approved_doc.txt",
        "This document is specifically approved by Wiske and has a final status. Suske should be able to see this.",
    ),
];

/// Priority: `--config` argument > `RAGWARD_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }
    if let Ok(path) = std::env::var("RAGWARD_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Create the documents directory if needed and seed it when empty.
///
/// Returns the number of sample files written.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, listed or written to.
pub fn prepare_documents_dir(dir: &Path, seed_samples: bool) -> anyhow::Result<usize> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create documents directory {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), "created documents directory");
    }

    let is_empty = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list documents directory {}", dir.display()))?
        .next()
        .is_none();
    if !is_empty {
        tracing::debug!(dir = %dir.display(), "documents directory not empty, skipping samples");
        return Ok(0);
    }
    if !seed_samples {
        return Ok(0);
    }

    for (name, content) in SAMPLE_DOCUMENTS {
        let path = dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write sample document {}", path.display()))?;
        tracing::debug!(file = %name, "wrote sample document");
    }
    tracing::info!(
        dir = %dir.display(),
        count = SAMPLE_DOCUMENTS.len(),
        "seeded sample documents"
    );
    Ok(SAMPLE_DOCUMENTS.len())
}

#[must_use]
pub fn create_embedder(config: &EmbeddingConfig) -> AnyEmbedder {
    let policy = EmbedPolicy {
        timeout: Duration::from_secs(config.timeout_secs),
        max_retries: config.max_retries,
        ..EmbedPolicy::default()
    };
    AnyEmbedder::Ollama(Resilient::new(
        OllamaEmbedder::new(&config.base_url, config.model.clone()),
        policy,
    ))
}

/// # Errors
///
/// Returns an error if the Qdrant client cannot be created.
pub fn create_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.backend {
        StoreBackend::Qdrant => {
            let store = QdrantStore::new(&config.qdrant_url)
                .context("failed to create Qdrant client")?
                .with_keyword_indexes([
                    fields::ORIGINAL_FILENAME,
                    fields::STATUS,
                    fields::APPROVED_BY,
                ]);
            tracing::info!(url = %config.qdrant_url, "using Qdrant vector store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory vector store, index is lost on restart");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
    }
}

/// Indexer and retriever sharing one store and one embedder.
pub struct Services<E> {
    pub indexer: Arc<DocumentIndexer<E>>,
    pub retriever: Arc<DocumentRetriever<E>>,
}

impl<E> Clone for Services<E> {
    fn clone(&self) -> Self {
        Self {
            indexer: Arc::clone(&self.indexer),
            retriever: Arc::clone(&self.retriever),
        }
    }
}

/// Wire services from validated config. Attributes are read from xattrs.
///
/// # Errors
///
/// Returns an error if the access rules or chunking settings are invalid.
pub fn build_services<E: EmbeddingProvider>(
    config: &Config,
    store: Arc<dyn VectorStore>,
    embedder: E,
) -> anyhow::Result<Services<E>> {
    let embedder = Arc::new(embedder);
    let policy = config.access_policy()?;

    let indexer = DocumentIndexer::new(
        Arc::clone(&store),
        Arc::clone(&embedder),
        Arc::new(XattrReader),
        config.indexer_config(),
    )
    .context("failed to create document indexer")?;
    let retriever = DocumentRetriever::new(store, embedder, policy, config.retrieval_config());

    Ok(Services {
        indexer: Arc::new(indexer),
        retriever: Arc::new(retriever),
    })
}
