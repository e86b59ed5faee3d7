use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use ragward_llm::provider::EmbeddingProvider;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::indexer::DocumentIndexer;

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub debounce: Duration,
    /// Pending paths buffered between the notify thread and the worker.
    pub queue_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            queue_capacity: 64,
        }
    }
}

/// Watches the documents directory and keeps the index in sync.
///
/// Dropping the watcher stops it.
pub struct IndexWatcher {
    handle: tokio::task::JoinHandle<()>,
}

impl IndexWatcher {
    /// # Errors
    ///
    /// Returns an error if the filesystem watcher cannot be initialized.
    pub fn start<E: EmbeddingProvider + 'static>(
        dir: &Path,
        indexer: Arc<DocumentIndexer<E>>,
        config: &WatcherConfig,
    ) -> Result<Self> {
        let (notify_tx, mut notify_rx) = mpsc::channel::<PathBuf>(config.queue_capacity.max(1));
        let extension = indexer.config().extension.clone();

        let mut debouncer = new_debouncer(
            config.debounce,
            move |events: std::result::Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                let events = match events {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!("document watcher error: {e}");
                        return;
                    }
                };

                let paths: HashSet<PathBuf> = events
                    .into_iter()
                    .filter(|e| {
                        e.kind == DebouncedEventKind::Any
                            && e.path
                                .extension()
                                .and_then(|x| x.to_str())
                                .is_some_and(|x| x == extension)
                    })
                    .map(|e| e.path)
                    .collect();

                // Blocks this notify thread when the queue is full, so bursts wait instead of dropping.
                for path in paths {
                    if notify_tx.blocking_send(path).is_err() {
                        return;
                    }
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(dir, notify::RecursiveMode::NonRecursive)?;
        tracing::info!(dir = %dir.display(), "watching documents directory");

        let handle = tokio::spawn(async move {
            let _debouncer = debouncer;
            while let Some(path) = notify_rx.recv().await {
                let indexer = Arc::clone(&indexer);
                tokio::spawn(async move { sync_path(&indexer, &path).await });
            }
        });

        Ok(Self { handle })
    }
}

impl Drop for IndexWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Reindex a changed document, or drop it from the index if it is gone.
async fn sync_path<E: EmbeddingProvider>(indexer: &DocumentIndexer<E>, path: &Path) {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        indexer.reindex_logged(path).await;
        return;
    }
    let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
        return;
    };
    if let Err(e) = indexer.remove_document(filename).await {
        tracing::warn!(file = %filename, "removing deleted document failed: {e}");
    }
}
