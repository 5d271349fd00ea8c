use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use extract::AnalysisResult;
use ingest::{Document, MediaType};
use pipeline::{Pipeline, PipelineError, PipelineOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics::{Metrics, MetricsSnapshot, RunRecord, TimedOperation};

pub struct AppState {
    pub pipeline: Pipeline,
    pub metrics: Arc<Metrics>,
    pub analysis_timeout: Option<Duration>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    /// Base64 document body, optionally as a `data:` URL
    data: String,
    media_type: String,
    #[serde(default = "default_chunked")]
    chunked: bool,
}

fn default_chunked() -> bool {
    true
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks_processed: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed_chunks: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicates_dropped: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AnalyzeResponse {
    fn ok(outcome: PipelineOutcome) -> Self {
        Self {
            success: true,
            result: Some(outcome.result),
            chunks_processed: Some(outcome.chunks_processed),
            failed_chunks: outcome.failed_chunks,
            duplicates_dropped: Some(outcome.duplicates_dropped),
            error: None,
        }
    }

    fn failed(error: String, chunks_processed: Option<usize>) -> Self {
        Self {
            success: false,
            result: None,
            chunks_processed,
            failed_chunks: Vec::new(),
            duplicates_dropped: None,
            error: Some(error),
        }
    }
}

pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> (StatusCode, Json<AnalyzeResponse>) {
    let run_id = Uuid::new_v4();

    let Some(media_type) = MediaType::from_mime(&req.media_type) else {
        warn!(%run_id, media_type = %req.media_type, "Unsupported media type");
        return (
            StatusCode::BAD_REQUEST,
            Json(AnalyzeResponse::failed(
                format!("Unsupported media type: {}", req.media_type),
                None,
            )),
        );
    };

    let bytes = match decode_payload(&req.data) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%run_id, error = %e, "Rejected undecodable payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(AnalyzeResponse::failed(format!("Invalid base64 data: {}", e), None)),
            );
        }
    };

    let document = Document::new(bytes, media_type);
    info!(
        %run_id,
        doc_id = %document.doc_id,
        bytes = document.bytes.len(),
        chunked = req.chunked,
        "Analysis requested"
    );

    let timer = TimedOperation::start();
    let run = async {
        if req.chunked {
            state.pipeline.analyze_document_chunked(&document).await
        } else {
            state.pipeline.analyze_document(&document).await
        }
    };

    let outcome = match state.analysis_timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(%run_id, limit_secs = limit.as_secs(), "Analysis timed out");
                state.metrics.record_run(RunRecord {
                    success: false,
                    duration: timer.elapsed(),
                    chunks_attempted: 0,
                    chunks_failed: 0,
                    transactions: 0,
                });
                return (
                    StatusCode::GATEWAY_TIMEOUT,
                    Json(AnalyzeResponse::failed(
                        format!("Analysis exceeded {}s", limit.as_secs()),
                        None,
                    )),
                );
            }
        },
        None => run.await,
    };

    match outcome {
        Ok(outcome) => {
            state.metrics.record_run(RunRecord {
                success: true,
                duration: timer.elapsed(),
                chunks_attempted: outcome.chunks_processed,
                chunks_failed: outcome.failed_chunks.len(),
                transactions: outcome.result.total_transactions,
            });
            info!(
                %run_id,
                chunks = outcome.chunks_processed,
                transactions = outcome.result.total_transactions,
                duplicates = outcome.duplicates_dropped,
                "Analysis succeeded"
            );
            (StatusCode::OK, Json(AnalyzeResponse::ok(outcome)))
        }
        Err(e) => {
            let attempted = e.chunks_processed().unwrap_or(0);
            state.metrics.record_run(RunRecord {
                success: false,
                duration: timer.elapsed(),
                chunks_attempted: attempted,
                chunks_failed: failed_chunk_count(&e),
                transactions: 0,
            });
            error!(%run_id, error = %e, "Analysis failed");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(AnalyzeResponse::failed(e.to_string(), e.chunks_processed())),
            )
        }
    }
}

fn failed_chunk_count(error: &PipelineError) -> usize {
    match error {
        PipelineError::NoUsableResults { attempted } => *attempted,
        PipelineError::ChunkSubmissionFailed { .. } => 1,
        PipelineError::MalformedDocument(_) | PipelineError::NoChunks => 0,
    }
}

fn decode_payload(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    STANDARD.decode(encoded.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use extract::{ExtractError, ExtractionService, Extractor};
    use ingest::testing::sample_pdf;
    use pipeline::PipelineOptions;
    use serde_json::Value;
    use tower::ServiceExt;

    struct Canned(Result<&'static str, u16>);

    #[async_trait]
    impl ExtractionService for Canned {
        async fn submit(&self, _document: &Document, _instruction: &str) -> Result<String, ExtractError> {
            match self.0 {
                Ok(body) => Ok(body.to_string()),
                Err(status) => Err(ExtractError::Status {
                    status,
                    body: String::new(),
                }),
            }
        }
    }

    struct Stalled;

    #[async_trait]
    impl ExtractionService for Stalled {
        async fn submit(&self, _document: &Document, _instruction: &str) -> Result<String, ExtractError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(REPLY.to_string())
        }
    }

    const REPLY: &str = r#"{"accountNumber": "4821", "months": [{"monthKey": "January 2024", "transactions": [
        {"date": "2024-01-15", "type": "zelle", "source": "J Doe", "amount": 250, "description": "ZELLE FROM J DOE"}
    ]}]}"#;

    fn app(reply: Result<&'static str, u16>) -> (Router, Arc<AppState>) {
        app_with(Arc::new(Canned(reply)), None)
    }

    fn app_with(
        service: Arc<dyn ExtractionService>,
        analysis_timeout: Option<Duration>,
    ) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState {
            pipeline: Pipeline::new(
                Extractor::new(service),
                PipelineOptions {
                    max_pages_per_chunk: 12,
                    chunk_delay: Duration::ZERO,
                },
            ),
            metrics: Metrics::new(),
            analysis_timeout,
        });
        (router(state.clone(), 1024 * 1024), state)
    }

    async fn post_analyze(app: Router, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(Ok(REPLY));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let (app, state) = app(Ok(REPLY));
        let data = STANDARD.encode(sample_pdf(3));

        let (status, body) = post_analyze(app, serde_json::json!({"data": data, "mediaType": "application/pdf"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["chunksProcessed"], 1);
        assert_eq!(body["result"]["accountNumber"], "4821");
        assert_eq!(body["result"]["totalIncome"], 250.0);
        assert_eq!(body["result"]["months"][0]["transactions"][0]["type"], "Zelle Transfer");
        assert_eq!(body["result"]["months"][0]["categories"]["Zelle Transfer"]["count"], 1);
        assert_eq!(body["duplicatesDropped"], 0);
        assert_eq!(state.metrics.snapshot().successful_runs, 1);
    }

    #[tokio::test]
    async fn test_analyze_accepts_data_url() {
        let (app, _) = app(Ok(REPLY));
        let data = format!("data:image/png;base64,{}", STANDARD.encode([0x89, b'P', b'N', b'G']));

        let (status, body) = post_analyze(app, serde_json::json!({"data": data, "mediaType": "image/png"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["totalTransactions"], 1);
    }

    #[tokio::test]
    async fn test_analyze_reports_pipeline_failure() {
        let (app, state) = app(Err(503));
        let data = STANDARD.encode(sample_pdf(30));

        let (status, body) = post_analyze(app, serde_json::json!({"data": data, "mediaType": "application/pdf"})).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["chunksProcessed"], 3);
        assert!(body["error"].as_str().unwrap().contains("3"));

        let snapshot = state.metrics.snapshot();
        assert_eq!(snapshot.failed_runs, 1);
        assert_eq!(snapshot.chunks_failed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_times_out() {
        let (app, state) = app_with(Arc::new(Stalled), Some(Duration::from_secs(1)));
        let data = STANDARD.encode([0x89, b'P', b'N', b'G']);

        let (status, body) = post_analyze(app, serde_json::json!({"data": data, "mediaType": "image/png"})).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["success"], false);
        assert!(body.get("result").is_none());
        assert!(body["error"].as_str().unwrap().contains("1s"));

        let snapshot = state.metrics.snapshot();
        assert_eq!(snapshot.total_runs, 1);
        assert_eq!(snapshot.failed_runs, 1);
        assert_eq!(snapshot.successful_runs, 0);
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_input() {
        let (app, _) = app(Ok(REPLY));
        let (status, _) = post_analyze(
            app.clone(),
            serde_json::json!({"data": "not base64!!", "mediaType": "application/pdf"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_analyze(app, serde_json::json!({"data": "AAAA", "mediaType": "text/csv"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("text/csv"));
    }
}
