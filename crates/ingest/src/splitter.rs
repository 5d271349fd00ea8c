use std::ops::Range;
use tracing::{debug, info};

use crate::chunk::Chunk;
use crate::document::Document;
use crate::error::SplitError;

pub const DEFAULT_MAX_PAGES: usize = 12;

pub struct SplitterConfig {
    pub max_pages: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

pub struct PageSplitter {
    config: SplitterConfig,
}

impl PageSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn max_pages(&self) -> usize {
        self.config.max_pages.max(1)
    }

    /// Split a document into ordered chunks of at most `max_pages` pages.
    ///
    /// Non-paginated documents and documents that already fit come back as a
    /// single chunk holding the original bytes.
    pub fn split(&self, document: &Document) -> Result<Vec<Chunk>, SplitError> {
        if !document.media_type.is_paginated() {
            debug!(media_type = document.media_type.mime(), "Non-paginated document, single chunk");
            return Ok(vec![Chunk::new(0, &document.doc_id, 0..1, document.clone())]);
        }

        let pdf = lopdf::Document::load_mem(&document.bytes)
            .map_err(|e| SplitError::MalformedDocument(e.to_string()))?;
        let total_pages = pdf.get_pages().len();

        if total_pages <= self.max_pages() {
            debug!(total_pages, "Document fits in one chunk");
            return Ok(vec![Chunk::new(
                0,
                &document.doc_id,
                0..total_pages,
                document.clone(),
            )]);
        }

        let ranges = page_ranges(total_pages, self.max_pages());
        info!(
            total_pages,
            max_pages = self.max_pages(),
            chunks = ranges.len(),
            "Splitting document"
        );

        let mut chunks = Vec::with_capacity(ranges.len());

        for (index, range) in ranges.into_iter().enumerate() {
            let bytes = extract_pages(&pdf, index, &range, total_pages)?;
            debug!(chunk = index, pages = ?range, bytes = bytes.len(), "Chunk written");

            chunks.push(Chunk::new(
                index,
                &document.doc_id,
                range,
                Document::new(bytes, document.media_type),
            ));
        }

        Ok(chunks)
    }
}

/// Contiguous half-open page ranges covering `0..total_pages`.
pub fn page_ranges(total_pages: usize, max_pages: usize) -> Vec<Range<usize>> {
    let max_pages = max_pages.max(1);

    (0..total_pages)
        .step_by(max_pages)
        .map(|start| start..(start + max_pages).min(total_pages))
        .collect()
}

/// Copy the source, drop every page outside `range`, and re-serialize.
fn extract_pages(
    source: &lopdf::Document,
    index: usize,
    range: &Range<usize>,
    total_pages: usize,
) -> Result<Vec<u8>, SplitError> {
    let mut doc = source.clone();

    // lopdf page numbers are 1-based
    let to_delete: Vec<u32> = (0..total_pages)
        .filter(|page| !range.contains(page))
        .map(|page| page as u32 + 1)
        .collect();

    doc.delete_pages(&to_delete);
    doc.prune_objects();
    doc.renumber_objects();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| SplitError::ChunkWrite {
        index,
        reason: e.to_string(),
    })?;

    Ok(buffer)
}
