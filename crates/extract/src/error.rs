use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Request never produced a response (connection, timeout, TLS)
    #[error("request to extraction service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("extraction service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Success status but no content to parse
    #[error("extraction service returned an empty response")]
    EmptyResponse,

    /// Body could not be parsed as JSON after fence stripping
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

impl ExtractError {
    /// Worth another attempt against the same service
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyResponse | Self::InvalidJson(_) => false,
        }
    }
}
