//! Chunk records and their store payload layout.

use std::collections::HashMap;
use std::path::Path;

use ragward_store::{FieldCondition, VectorFilter, VectorPoint};

use crate::attributes::AccessAttributes;

/// Payload keys written for every chunk.
pub mod fields {
    pub const CHUNK_ID: &str = "chunk_id";
    pub const ORIGINAL_FILENAME: &str = "original_filename";
    pub const CHUNK_INDEX: &str = "chunk_index";
    pub const TOTAL_CHUNKS: &str = "total_chunks";
    pub const STATUS: &str = "status";
    pub const APPROVED_BY: &str = "approved_by";
    pub const CONTENT: &str = "content";
}

/// Deterministic chunk id: `doc_<stem>_chunk_<index>`, where the stem is
/// lowercased with spaces and hyphens replaced by underscores.
#[must_use]
pub fn chunk_id(filename: &str, index: usize) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map_or_else(|| filename.to_owned(), |s| s.to_string_lossy().into_owned());
    let normalized = stem.replace([' ', '-'], "_").to_lowercase();
    format!("doc_{normalized}_chunk_{index}")
}

/// Store key of one chunk. Unlike [`chunk_id`] it is unique per filename,
/// since a filename never contains `/`.
#[must_use]
pub fn point_key(filename: &str, index: usize) -> String {
    format!("{filename}/{index}")
}

/// Listing id of a whole document: `orig_doc_<filename>` with dots replaced.
#[must_use]
pub fn document_id(filename: &str) -> String {
    format!("orig_doc_{}", filename.replace('.', "_").to_lowercase())
}

/// Matches every chunk that belongs to `filename`.
#[must_use]
pub fn filename_filter(filename: &str) -> VectorFilter {
    VectorFilter::must(vec![FieldCondition::text(
        fields::ORIGINAL_FILENAME,
        filename,
    )])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub id: String,
    pub original_filename: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub content: String,
    pub attributes: AccessAttributes,
}

impl DocumentChunk {
    /// Build every chunk of one document, copying its attributes onto each.
    #[must_use]
    pub fn from_pieces(
        filename: &str,
        pieces: Vec<String>,
        attributes: &AccessAttributes,
    ) -> Vec<Self> {
        let total_chunks = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Self {
                id: chunk_id(filename, chunk_index),
                original_filename: filename.to_owned(),
                chunk_index,
                total_chunks,
                content,
                attributes: attributes.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn into_point(self, vector: Vec<f32>) -> VectorPoint {
        let id = point_key(&self.original_filename, self.chunk_index);
        let payload = HashMap::from([
            (fields::CHUNK_ID.to_owned(), self.id.into()),
            (
                fields::ORIGINAL_FILENAME.to_owned(),
                self.original_filename.into(),
            ),
            (fields::CHUNK_INDEX.to_owned(), self.chunk_index.into()),
            (fields::TOTAL_CHUNKS.to_owned(), self.total_chunks.into()),
            (fields::STATUS.to_owned(), self.attributes.status.into()),
            (
                fields::APPROVED_BY.to_owned(),
                self.attributes.approved_by.into(),
            ),
            (fields::CONTENT.to_owned(), self.content.into()),
        ]);
        VectorPoint {
            id,
            vector,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_normalizes_stem() {
        assert_eq!(chunk_id("Security Policy-v2.txt", 0), "doc_security_policy_v2_chunk_0");
        assert_eq!(chunk_id("notes.txt", 12), "doc_notes_chunk_12");
    }

    #[test]
    fn chunk_id_keeps_inner_dots() {
        assert_eq!(chunk_id("a.b.txt", 1), "doc_a.b_chunk_1");
    }

    #[test]
    fn colliding_chunk_ids_get_distinct_point_keys() {
        let names = ["a_b.txt", "a-b.txt", "a b.txt", "A_B.txt"];
        assert!(names.iter().all(|n| chunk_id(n, 0) == "doc_a_b_chunk_0"));

        let keys: std::collections::HashSet<_> = names.iter().map(|n| point_key(n, 0)).collect();
        assert_eq!(keys.len(), names.len());
        assert_ne!(point_key("a.txt", 10), point_key("a.txt/1", 0));
    }

    #[test]
    fn document_id_replaces_dots() {
        assert_eq!(document_id("Old_HR.Policy.txt"), "orig_doc_old_hr_policy_txt");
    }

    #[test]
    fn pieces_share_attributes_and_total() {
        let attrs = AccessAttributes::new("final", "Wiske");
        let chunks = DocumentChunk::from_pieces("a.txt", vec!["x".into(), "y".into()], &attrs);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.total_chunks == 2 && c.attributes == attrs));
        assert_eq!(chunks[1].id, "doc_a_chunk_1");
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn point_payload_layout() {
        let attrs = AccessAttributes::new("draft", "unknown");
        let chunk = DocumentChunk::from_pieces("a.txt", vec!["hello".into()], &attrs).remove(0);
        let point = chunk.into_point(vec![1.0]);
        assert_eq!(point.id, "a.txt/0");
        assert_eq!(point.payload[fields::CHUNK_ID], "doc_a_chunk_0");
        assert_eq!(point.payload[fields::ORIGINAL_FILENAME], "a.txt");
        assert_eq!(point.payload[fields::CHUNK_INDEX], 0);
        assert_eq!(point.payload[fields::TOTAL_CHUNKS], 1);
        assert_eq!(point.payload[fields::STATUS], "draft");
        assert_eq!(point.payload[fields::APPROVED_BY], "unknown");
        assert_eq!(point.payload[fields::CONTENT], "hello");
        assert!(point.payload.keys().all(|k| !k.contains('.')));
    }

    #[test]
    fn filename_filter_matches_only_that_file() {
        let filter = filename_filter("a.txt");
        let mine = HashMap::from([(fields::ORIGINAL_FILENAME.to_owned(), "a.txt".into())]);
        let other = HashMap::from([(fields::ORIGINAL_FILENAME.to_owned(), "b.txt".into())]);
        assert!(filter.matches(&mine));
        assert!(!filter.matches(&other));
    }
}
