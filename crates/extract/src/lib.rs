pub mod decode;
pub mod error;
pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod schema;

pub use decode::{decode_partial_result, strip_code_fence};
pub use error::ExtractError;
pub use llm::{ChatCompletionsClient, ExtractionService};
pub use normalizer::{CATEGORIES, CategoryNormalizer, CategoryRule, normalize_description};
pub use schema::{AnalysisResult, CategoryTotal, MonthBucket, NO_ACCOUNT, PartialResult, Transaction};

use ingest::{Chunk, Document};
use std::sync::Arc;
use tracing::debug;

/// Submits documents to an extraction service and decodes the replies.
#[derive(Clone)]
pub struct Extractor {
    service: Arc<dyn ExtractionService>,
}

impl Extractor {
    pub fn new(service: Arc<dyn ExtractionService>) -> Self {
        Self { service }
    }

    /// Extract from a whole document in a single call
    pub async fn extract_document(&self, document: &Document) -> Result<PartialResult, ExtractError> {
        let instruction = prompt::build_extraction_prompt();
        self.submit(document, &instruction).await
    }

    /// Extract from one chunk of a split document
    pub async fn extract_chunk(
        &self,
        chunk: &Chunk,
        total_chunks: usize,
    ) -> Result<PartialResult, ExtractError> {
        debug!(
            chunk = chunk.index,
            chunk_id = %chunk.chunk_id,
            pages = ?chunk.page_range,
            "Extracting chunk"
        );
        let instruction = prompt::build_chunk_prompt(chunk.index, total_chunks, &chunk.page_range);
        self.submit(&chunk.document, &instruction).await
    }

    async fn submit(&self, document: &Document, instruction: &str) -> Result<PartialResult, ExtractError> {
        let raw = self.service.submit(document, instruction).await?;
        let partial = decode_partial_result(&raw)?;

        debug!(
            months = partial.months.len(),
            transactions = partial.months.iter().map(|m| m.transactions.len()).sum::<usize>(),
            "Decoded partial result"
        );

        Ok(partial)
    }
}
