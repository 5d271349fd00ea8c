use sha2::{Digest, Sha256};
use std::ops::Range;

use crate::document::Document;

/// A page-bounded sub-document, independently submittable.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub chunk_id: String,
    pub page_range: Range<usize>, // 0-based, end exclusive
    pub document: Document,
}

impl Chunk {
    pub fn new(index: usize, source_doc_id: &str, page_range: Range<usize>, document: Document) -> Self {
        let chunk_id = Self::generate_chunk_id(source_doc_id, &page_range);

        Self {
            index,
            chunk_id,
            page_range,
            document,
        }
    }

    fn generate_chunk_id(source_doc_id: &str, page_range: &Range<usize>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_doc_id.as_bytes());
        hasher.update(page_range.start.to_string().as_bytes());
        hasher.update(page_range.end.to_string().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    pub fn page_count(&self) -> usize {
        self.page_range.len()
    }
}
