use ingest::SplitError;
use thiserror::Error;

/// Failures surfaced at the pipeline boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Pages could not be determined for a document that needed splitting
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The only chunk failed
    #[error("chunk {index} submission failed: {reason}")]
    ChunkSubmissionFailed { index: usize, reason: String },

    /// Every chunk was attempted and none produced a usable result
    #[error("no usable results from {attempted} chunk(s)")]
    NoUsableResults { attempted: usize },

    #[error("document produced no chunks to submit")]
    NoChunks,
}

impl PipelineError {
    /// How many chunks were attempted before the failure, where known.
    pub fn chunks_processed(&self) -> Option<usize> {
        match self {
            Self::MalformedDocument(_) => None,
            Self::ChunkSubmissionFailed { .. } => Some(1),
            Self::NoUsableResults { attempted } => Some(*attempted),
            Self::NoChunks => Some(0),
        }
    }
}

impl From<SplitError> for PipelineError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::MalformedDocument(reason) => Self::MalformedDocument(reason),
            other => Self::MalformedDocument(other.to_string()),
        }
    }
}
