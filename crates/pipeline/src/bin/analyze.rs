use anyhow::{Context, Result};
use clap::Parser;
use extract::{ChatCompletionsClient, Extractor};
use ingest::FileReader;
use pipeline::{Pipeline, PipelineOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "analyze", about = "Reconcile incoming transactions from a bank statement")]
struct Args {
    /// Statement file (.pdf, .png, .jpg, .gif, .webp)
    path: PathBuf,

    /// Submit the whole document in one call without splitting
    #[arg(long)]
    direct: bool,

    #[arg(long, env = "MAX_PAGES_PER_CHUNK", default_value_t = 12)]
    max_pages: usize,

    /// Pause between chunk submissions
    #[arg(long, env = "CHUNK_DELAY_SECS", default_value_t = 90)]
    delay_secs: u64,

    #[arg(long, env = "EXTRACTION_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    #[arg(long, env = "EXTRACTION_MODEL", default_value = "gpt-4o")]
    model: String,

    #[arg(long, env = "EXTRACTION_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "EXTRACTION_TIMEOUT_SECS", default_value_t = 300)]
    timeout_secs: u64,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let document = FileReader::read_document(&args.path).await?;

    let client = ChatCompletionsClient::new(args.base_url, args.model, args.api_key)
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .context("Failed to build extraction client")?;

    let pipeline = Pipeline::new(
        Extractor::new(Arc::new(client)),
        PipelineOptions {
            max_pages_per_chunk: args.max_pages,
            chunk_delay: Duration::from_secs(args.delay_secs),
        },
    );

    let outcome = if args.direct {
        pipeline.analyze_document(&document).await
    } else {
        pipeline.analyze_document_chunked(&document).await
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            let processed = e
                .chunks_processed()
                .map(|n| format!(" ({} chunk(s) processed)", n))
                .unwrap_or_default();
            anyhow::bail!("Analysis failed: {}{}", e, processed);
        }
    };

    tracing::info!(
        chunks = outcome.chunks_processed,
        duplicates = outcome.duplicates_dropped,
        "Statement reconciled"
    );
    if !outcome.failed_chunks.is_empty() {
        tracing::warn!(failed = ?outcome.failed_chunks, "Some chunks were skipped");
    }

    let json = serde_json::to_string_pretty(&outcome.result)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json).context(format!("Failed to write {:?}", path))?;
            println!(
                "✅ {} transactions across {} months written to {:?}",
                outcome.result.total_transactions,
                outcome.result.months.len(),
                path
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
