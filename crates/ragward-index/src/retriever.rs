//! Access-filtered semantic search over indexed chunks.

use std::collections::HashMap;
use std::sync::Arc;

use ragward_llm::provider::EmbeddingProvider;
use ragward_store::{ScoredVectorPoint, VectorStore};
use serde::Serialize;

use crate::attributes::UNKNOWN;
use crate::document::{document_id, fields};
use crate::error::{IndexError, Result};
use crate::policy::AccessPolicy;

const NOT_AVAILABLE: &str = "N/A";

/// Retrieval configuration.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub collection: String,
    /// Maximum number of chunks returned per search.
    pub limit: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: "llm_documents_collection".into(),
            limit: 5,
        }
    }
}

/// One matching chunk. Serialized field names are the public wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub original_filename: String,
    pub content: String,
    #[serde(rename = "user.status")]
    pub status: String,
    #[serde(rename = "user.approved_by")]
    pub approved_by: String,
    pub chunk_index: i64,
    /// `1 - cosine similarity`; lower is closer.
    pub distance: f32,
}

/// One indexed document, described by an arbitrary one of its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    #[serde(rename = "user.status")]
    pub status: String,
    #[serde(rename = "user.approved_by")]
    pub approved_by: String,
}

pub struct DocumentRetriever<E> {
    store: Arc<dyn VectorStore>,
    embedder: Arc<E>,
    policy: AccessPolicy,
    config: RetrievalConfig,
}

impl<E: EmbeddingProvider> DocumentRetriever<E> {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<E>,
        policy: AccessPolicy,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            policy,
            config,
        }
    }

    /// Search as `identity`, returning at most `limit` chunks by ascending distance.
    ///
    /// An unknown or absent identity is not an error; it yields no results.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyQuery`] for a blank query, or an error if
    /// embedding or the store search fails.
    pub async fn search(&self, query: &str, identity: Option<&str>) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(IndexError::EmptyQuery);
        }

        let predicate = self.policy.resolve(identity);
        tracing::debug!(identity = ?identity, predicate = ?predicate, "resolved access predicate");

        let vector = self.embedder.embed(query).await?;
        let hits = self
            .store
            .search(
                &self.config.collection,
                vector,
                self.config.limit,
                predicate.as_ref().map(|p| p.to_filter()),
            )
            .await?;

        let mut results: Vec<SearchResult> = hits.into_iter().map(to_search_result).collect();
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(usize::try_from(self.config.limit)?);

        tracing::info!(identity = ?identity, results = results.len(), "search completed");
        Ok(results)
    }

    /// One summary per indexed filename, sorted by filename.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scrolled.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let collection = &self.config.collection;
        if !self.store.collection_exists(collection).await? {
            return Ok(Vec::new());
        }

        let indexed = self
            .store
            .scroll_all(collection, fields::ORIGINAL_FILENAME)
            .await?;
        let mut documents: Vec<DocumentSummary> = indexed
            .into_iter()
            .map(|(filename, attrs)| to_summary(filename, &attrs))
            .collect();
        documents.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(documents)
    }
}

fn to_search_result(hit: ScoredVectorPoint) -> SearchResult {
    let text = |key: &str| {
        hit.payload
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
    };
    SearchResult {
        original_filename: text(fields::ORIGINAL_FILENAME).unwrap_or_else(|| UNKNOWN.to_owned()),
        content: text(fields::CONTENT).unwrap_or_default(),
        status: text(fields::STATUS).unwrap_or_else(|| UNKNOWN.to_owned()),
        approved_by: text(fields::APPROVED_BY).unwrap_or_else(|| UNKNOWN.to_owned()),
        chunk_index: hit
            .payload
            .get(fields::CHUNK_INDEX)
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(-1),
        distance: 1.0 - hit.score,
        id: text(fields::CHUNK_ID).unwrap_or(hit.id),
    }
}

fn to_summary(filename: String, attrs: &HashMap<String, String>) -> DocumentSummary {
    let field = |key: &str| {
        attrs
            .get(key)
            .cloned()
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
    };
    DocumentSummary {
        id: document_id(&filename),
        status: field(fields::STATUS),
        approved_by: field(fields::APPROVED_BY),
        filename,
    }
}
