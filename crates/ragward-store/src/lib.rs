//! Vector index storage with Qdrant and in-memory backends.

pub mod in_memory_store;
pub mod qdrant_store;
pub mod vector_store;

pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_store::QdrantStore;
pub use vector_store::{
    FieldCondition, FieldValue, ScoredVectorPoint, ScrollResult, VectorFilter, VectorPoint,
    VectorStore, VectorStoreError,
};
