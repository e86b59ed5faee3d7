//! Document indexing pipeline: delete → read → split → embed → upsert.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use ragward_llm::provider::EmbeddingProvider;
use ragward_store::VectorStore;

use crate::attributes::AttributeSource;
use crate::chunker::TextSplitter;
use crate::document::{DocumentChunk, fields, filename_filter};
use crate::error::{IndexError, Result};
use crate::locks::KeyedLocks;

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub collection: String,
    /// File extension (without dot) of indexable documents.
    pub extension: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sideload_concurrency: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            collection: "llm_documents_collection".into(),
            extension: "txt".into(),
            chunk_size: 1000,
            chunk_overlap: 200,
            sideload_concurrency: 4,
        }
    }
}

/// Result of a successful [`DocumentIndexer::reindex`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexOutcome {
    /// The document's chunk set was replaced with `chunks` new chunks.
    Indexed { chunks: usize },
    /// The document split into zero chunks; its previous chunks stay deleted.
    NoContent,
    /// Not a regular file with the document extension. Nothing was touched.
    Rejected,
}

/// Summary of a [`DocumentIndexer::sideload`] run.
#[derive(Debug, Default)]
pub struct SideloadReport {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_rejected: usize,
    pub files_empty: usize,
    pub chunks_created: usize,
    pub chunks_removed: u64,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Keeps the vector store in sync with the documents on disk.
pub struct DocumentIndexer<E> {
    store: Arc<dyn VectorStore>,
    embedder: Arc<E>,
    attributes: Arc<dyn AttributeSource>,
    splitter: TextSplitter,
    locks: KeyedLocks,
    config: IndexerConfig,
}

impl<E: EmbeddingProvider> DocumentIndexer<E> {
    /// # Errors
    ///
    /// Returns [`IndexError::Config`] if the chunking parameters are invalid.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<E>,
        attributes: Arc<dyn AttributeSource>,
        config: IndexerConfig,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            store,
            embedder,
            attributes,
            splitter,
            locks: KeyedLocks::new(),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Whether `path` carries the document extension. Existence is not checked.
    #[must_use]
    pub fn is_document_path(&self, path: &Path) -> bool {
        has_extension(path, &self.config.extension)
    }

    /// Probe the embedder for its vector size and create the collection if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe embedding or collection creation fails.
    pub async fn ensure_collection(&self) -> Result<u64> {
        let probe = self.embedder.embed("probe").await?;
        let vector_size = u64::try_from(probe.len())?;
        self.store
            .ensure_collection(&self.config.collection, vector_size)
            .await?;
        Ok(vector_size)
    }

    /// Replace every chunk of the document at `path` with a fresh chunk set.
    ///
    /// Calls for the same filename are serialized; different filenames run in
    /// parallel. A read failure after the delete step leaves the document
    /// without chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if reading, embedding or storing fails.
    pub async fn reindex(&self, path: &Path) -> Result<ReindexOutcome> {
        let Some(filename) = self.accepted_filename(path).await else {
            tracing::info!(path = %path.display(), "not a document, skipping");
            return Ok(ReindexOutcome::Rejected);
        };

        let _guard = self.locks.lock(&filename).await;
        let result = self.replace_chunks(path, &filename).await;
        match &result {
            Ok(ReindexOutcome::Indexed { chunks }) => {
                tracing::info!(file = %filename, chunks, "document indexed");
            }
            Ok(ReindexOutcome::NoContent) => {
                tracing::info!(file = %filename, "document has no content, chunks removed");
            }
            Ok(ReindexOutcome::Rejected) => {}
            Err(e) => tracing::warn!(file = %filename, "reindex failed: {e}"),
        }
        result
    }

    /// [`reindex`](Self::reindex) for fire-and-forget callers: `true` only when
    /// a new chunk set was stored.
    pub async fn reindex_logged(&self, path: &Path) -> bool {
        matches!(
            self.reindex(path).await,
            Ok(ReindexOutcome::Indexed { .. })
        )
    }

    /// Delete all chunks of `filename`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot count or delete.
    pub async fn remove_document(&self, filename: &str) -> Result<u64> {
        let _guard = self.locks.lock(filename).await;
        let filter = filename_filter(filename);
        let collection = &self.config.collection;
        let removed = self.store.count(collection, Some(filter.clone())).await?;
        if removed > 0 {
            self.store.delete_by_filter(collection, filter).await?;
        }
        tracing::info!(file = %filename, removed, "document removed from index");
        Ok(removed)
    }

    /// Index every document in `dir` and prune filenames no longer on disk.
    ///
    /// Individual failures are collected into the report and do not stop the run.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` cannot be listed or the indexed filenames
    /// cannot be read back.
    pub async fn sideload(&self, dir: &Path) -> Result<SideloadReport> {
        let start = std::time::Instant::now();
        let mut report = SideloadReport::default();

        let mut paths = Vec::new();
        let mut on_disk: HashSet<String> = HashSet::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                on_disk.insert(name.to_owned());
            }
            paths.push(entry.path());
        }
        paths.sort();

        let total = paths.len();
        tracing::info!(dir = %dir.display(), total, "sideload started");

        let concurrency = self.config.sideload_concurrency.max(1);
        let mut results = futures::stream::iter(paths)
            .map(|path| async move {
                let outcome = self.reindex(&path).await;
                (path, outcome)
            })
            .buffer_unordered(concurrency);

        while let Some((path, outcome)) = results.next().await {
            report.files_scanned += 1;
            match outcome {
                Ok(ReindexOutcome::Indexed { chunks }) => {
                    report.files_indexed += 1;
                    report.chunks_created += chunks;
                }
                Ok(ReindexOutcome::NoContent) => report.files_empty += 1,
                Ok(ReindexOutcome::Rejected) => report.files_rejected += 1,
                Err(e) => report.errors.push(format!("{}: {e}", path.display())),
            }
        }
        drop(results);

        let indexed = self
            .store
            .scroll_all(&self.config.collection, fields::ORIGINAL_FILENAME)
            .await?;
        for stale in indexed.keys().filter(|f| !on_disk.contains(*f)) {
            match self.remove_document(stale).await {
                Ok(n) => report.chunks_removed += n,
                Err(e) => report.errors.push(format!("cleanup {stale}: {e}")),
            }
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            scanned = report.files_scanned,
            indexed = report.files_indexed,
            chunks = report.chunks_created,
            removed = report.chunks_removed,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "sideload finished"
        );
        Ok(report)
    }

    async fn accepted_filename(&self, path: &Path) -> Option<String> {
        if !self.is_document_path(path) {
            return None;
        }
        let meta = tokio::fs::metadata(path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        path.file_name()?.to_str().map(str::to_owned)
    }

    async fn replace_chunks(&self, path: &Path, filename: &str) -> Result<ReindexOutcome> {
        let collection = &self.config.collection;
        self.store
            .delete_by_filter(collection, filename_filter(filename))
            .await?;

        let text = tokio::fs::read_to_string(path).await?;
        let pieces = self.splitter.split(&text);
        if pieces.is_empty() {
            return Ok(ReindexOutcome::NoContent);
        }

        let attributes = self.attributes.access_attributes(path);
        let chunks = DocumentChunk::from_pieces(filename, pieces, &attributes);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::EmbeddingMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let count = chunks.len();
        let points = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| chunk.into_point(vector))
            .collect();
        self.store.upsert(collection, points).await?;
        Ok(ReindexOutcome::Indexed { chunks: count })
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == extension)
}

#[cfg(test)]
mod tests {
    use ragward_llm::mock::MockEmbedder;
    use ragward_store::InMemoryVectorStore;

    use super::*;
    use crate::attributes::FixedAttributes;

    fn indexer(
        store: &Arc<InMemoryVectorStore>,
        embedder: MockEmbedder,
    ) -> DocumentIndexer<MockEmbedder> {
        DocumentIndexer::new(
            Arc::clone(store) as Arc<dyn VectorStore>,
            Arc::new(embedder),
            Arc::new(FixedAttributes::new()),
            IndexerConfig {
                chunk_size: 50,
                chunk_overlap: 10,
                ..IndexerConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn extension_check() {
        assert!(has_extension(Path::new("/d/a.txt"), "txt"));
        assert!(!has_extension(Path::new("/d/a.TXT"), "txt"));
        assert!(!has_extension(Path::new("/d/a.md"), "txt"));
        assert!(!has_extension(Path::new("/d/txt"), "txt"));
    }

    #[test]
    fn invalid_chunking_rejected() {
        let store = Arc::new(InMemoryVectorStore::new());
        let result = DocumentIndexer::new(
            store as Arc<dyn VectorStore>,
            Arc::new(MockEmbedder::default()),
            Arc::new(FixedAttributes::new()),
            IndexerConfig {
                chunk_size: 10,
                chunk_overlap: 10,
                ..IndexerConfig::default()
            },
        );
        assert!(matches!(result, Err(IndexError::Config(_))));
    }

    #[tokio::test]
    async fn ensure_collection_uses_probe_dimension() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(&store, MockEmbedder::default());
        assert_eq!(indexer.ensure_collection().await.unwrap(), 64);
        assert!(store.collection_exists("llm_documents_collection").await.unwrap());
    }

    #[tokio::test]
    async fn directory_and_wrong_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "hello").unwrap();
        std::fs::create_dir(dir.path().join("sub.txt")).unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = MockEmbedder::default();
        let indexer = indexer(&store, embedder.clone());

        for name in ["notes.md", "sub.txt", "missing.txt"] {
            let outcome = indexer.reindex(&dir.path().join(name)).await.unwrap();
            assert_eq!(outcome, ReindexOutcome::Rejected, "{name}");
        }
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn embed_failure_is_error_and_logged_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "some words here").unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        store.ensure_collection("llm_documents_collection", 64).await.unwrap();
        let indexer = indexer(&store, MockEmbedder::failing());

        assert!(matches!(indexer.reindex(&path).await, Err(IndexError::Llm(_))));
        assert!(!indexer.reindex_logged(&path).await);
    }

    #[tokio::test]
    async fn missing_collection_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "text").unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(&store, MockEmbedder::default());
        assert!(matches!(indexer.reindex(&path).await, Err(IndexError::Store(_))));
    }

    #[tokio::test]
    async fn invalid_utf8_is_read_error_not_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        store.ensure_collection("llm_documents_collection", 64).await.unwrap();
        let indexer = indexer(&store, MockEmbedder::default());
        assert!(matches!(indexer.reindex(&path).await, Err(IndexError::Io(_))));
    }

    #[tokio::test]
    async fn remove_document_counts_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "word ".repeat(40)).unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = indexer(&store, MockEmbedder::default());
        indexer.ensure_collection().await.unwrap();

        let ReindexOutcome::Indexed { chunks } = indexer.reindex(&path).await.unwrap() else {
            panic!("expected indexed");
        };
        assert_eq!(
            indexer.remove_document("a.txt").await.unwrap(),
            u64::try_from(chunks).unwrap()
        );
        assert_eq!(indexer.remove_document("a.txt").await.unwrap(), 0);
    }
}
