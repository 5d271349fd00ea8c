use pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub chunking: ChunkingConfig,
    pub retry: RetryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_pages_per_chunk: usize,
    pub chunk_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_body_bytes: usize,
    /// Whole-run limit per request, none when unset
    pub analysis_timeout_secs: Option<u64>,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o".to_string(),
                api_key: None,
                request_timeout_secs: 300,
            },
            chunking: ChunkingConfig {
                max_pages_per_chunk: 12,
                chunk_delay_secs: 90,
            },
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
                max_body_bytes: 50 * 1024 * 1024,
                analysis_timeout_secs: None,
                json_logs: false,
            },
        }
    }
}

impl AppConfig {
    /// Defaults overridden by environment variables (and `.env`, if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            extraction: ExtractionConfig {
                base_url: get("EXTRACTION_BASE_URL").unwrap_or(defaults.extraction.base_url),
                model: get("EXTRACTION_MODEL").unwrap_or(defaults.extraction.model),
                api_key: get("EXTRACTION_API_KEY"),
                request_timeout_secs: parse_or(get("EXTRACTION_TIMEOUT_SECS"), defaults.extraction.request_timeout_secs),
            },
            chunking: ChunkingConfig {
                max_pages_per_chunk: parse_or(get("MAX_PAGES_PER_CHUNK"), defaults.chunking.max_pages_per_chunk),
                chunk_delay_secs: parse_or(get("CHUNK_DELAY_SECS"), defaults.chunking.chunk_delay_secs),
            },
            retry: RetryConfig {
                max_retries: parse_or(get("RETRY_MAX_RETRIES"), defaults.retry.max_retries),
                initial_backoff_ms: parse_or(get("RETRY_INITIAL_BACKOFF_MS"), defaults.retry.initial_backoff_ms),
                max_backoff_ms: parse_or(get("RETRY_MAX_BACKOFF_MS"), defaults.retry.max_backoff_ms),
            },
            server: ServerConfig {
                bind_addr: get("BIND_ADDR").unwrap_or(defaults.server.bind_addr),
                max_body_bytes: parse_or(get("MAX_BODY_BYTES"), defaults.server.max_body_bytes),
                analysis_timeout_secs: get("ANALYSIS_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()),
                json_logs: get("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
            },
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_pages_per_chunk: self.chunking.max_pages_per_chunk,
            chunk_delay: Duration::from_secs(self.chunking.chunk_delay_secs),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
