use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    /// Labeled as paginated but pages could not be read
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A chunk could not be re-serialized as a standalone document
    #[error("failed to write chunk {index}: {reason}")]
    ChunkWrite { index: usize, reason: String },
}
