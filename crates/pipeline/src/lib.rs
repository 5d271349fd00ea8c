pub mod error;
pub mod scheduler;

pub use error::PipelineError;
pub use scheduler::{ChunkFailure, ChunkOutcome, ChunkScheduler, DEFAULT_CHUNK_DELAY, ScheduleReport};

use extract::{AnalysisResult, Extractor};
use ingest::{DEFAULT_MAX_PAGES, Document, PageSplitter, SplitterConfig};
use reconcile::ResultMerger;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_pages_per_chunk: usize,
    pub chunk_delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_pages_per_chunk: DEFAULT_MAX_PAGES,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub result: AnalysisResult,
    pub chunks_processed: usize,
    pub failed_chunks: Vec<usize>,
    /// Repeat reports of the same transaction dropped during the merge
    pub duplicates_dropped: usize,
}

/// Statement in, one reconciled income report out.
pub struct Pipeline {
    extractor: Extractor,
    merger: ResultMerger,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(extractor: Extractor, options: PipelineOptions) -> Self {
        Self {
            extractor,
            merger: ResultMerger::new(),
            options,
        }
    }

    /// Submit the whole document in one call, for callers that know it is small.
    pub async fn analyze_document(&self, document: &Document) -> Result<PipelineOutcome, PipelineError> {
        info!(doc_id = %document.doc_id, media_type = document.media_type.mime(), "Analyzing document directly");

        let extractor = &self.extractor;
        let report = ChunkScheduler::new(Duration::ZERO)
            .schedule(vec![document], |doc| async move { extractor.extract_document(doc).await })
            .await?;

        Ok(self.finish(report))
    }

    /// Split, submit each chunk in order, and reconcile the partial results.
    pub async fn analyze_document_chunked(&self, document: &Document) -> Result<PipelineOutcome, PipelineError> {
        let splitter = PageSplitter::new(SplitterConfig {
            max_pages: self.options.max_pages_per_chunk,
        });
        let chunks = splitter.split(document)?;
        let total_chunks = chunks.len();

        info!(
            doc_id = %document.doc_id,
            media_type = document.media_type.mime(),
            chunks = total_chunks,
            "Analyzing document in chunks"
        );

        let extractor = &self.extractor;
        let report = ChunkScheduler::new(self.options.chunk_delay)
            .schedule(chunks, |chunk| async move {
                extractor.extract_chunk(&chunk, total_chunks).await
            })
            .await?;

        Ok(self.finish(report))
    }

    fn finish(&self, report: ScheduleReport<extract::PartialResult>) -> PipelineOutcome {
        for failure in &report.failures {
            warn!(chunk = failure.index, reason = %failure.reason, "Chunk excluded from merge");
        }

        let partials = report.results.into_iter().map(|(_, partial)| partial).collect();
        let (result, stats) = self.merger.merge_with_stats(partials);

        info!(
            chunks = report.attempted,
            failed = report.failures.len(),
            months = stats.months,
            transactions = stats.transactions_kept,
            duplicates = stats.duplicates_dropped,
            "Analysis complete"
        );

        PipelineOutcome {
            result,
            chunks_processed: report.attempted,
            failed_chunks: report.failures.iter().map(|f| f.index).collect(),
            duplicates_dropped: stats.duplicates_dropped,
        }
    }
}
