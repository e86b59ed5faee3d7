//! Document indexing and access-filtered semantic retrieval.
//!
//! Text documents are split into overlapping chunks, embedded, and stored
//! together with access attributes read from extended attributes. Searches
//! resolve the caller's identity to a metadata predicate before the vector
//! search runs, and a filesystem watcher keeps the index in step with disk.

pub mod attributes;
pub mod chunker;
pub mod document;
pub mod error;
pub mod indexer;
pub mod locks;
pub mod policy;
pub mod retriever;
pub mod watcher;

pub use attributes::{AccessAttributes, AttributeSource, FixedAttributes, XattrReader};
pub use error::{IndexError, Result};
pub use indexer::{DocumentIndexer, IndexerConfig, ReindexOutcome, SideloadReport};
pub use policy::{AccessPolicy, AccessPredicate, AccessRule};
pub use retriever::{DocumentRetriever, DocumentSummary, RetrievalConfig, SearchResult};
pub use watcher::{IndexWatcher, WatcherConfig};
