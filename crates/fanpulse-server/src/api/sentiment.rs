use axum::{extract::State, Extension, Json};
use fanpulse_analytics::{cleanup_duplicate_verdicts, CleanupReport, StoreError};
use fanpulse_core::{Label, Provenance};
use fanpulse_sentiment::SentimentError;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_analytics_error, map_sentiment_error, ApiError, ApiResponse, AppState, ErrorBody,
};

const MAX_BATCH_TEXTS: usize = 50;
const BATCH_CONCURRENCY: usize = 4;

#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AnalyzeResult {
    pub label: Label,
    pub score: f64,
    pub signed_score: f64,
    pub confidence: f64,
    pub model_used: Provenance,
    /// Team the text would be attributed to on ingestion.
    pub team: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeBatchRequest {
    pub texts: Vec<String>,
}

/// One batch slot. Exactly one of `result` and `error` is set.
#[derive(Debug, Serialize)]
pub(super) struct BatchItem {
    pub index: usize,
    pub result: Option<AnalyzeResult>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub(super) struct BatchResults {
    pub results: Vec<BatchItem>,
    pub success_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct LabelBreakdown {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct ConfidenceBands {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct SentimentStats {
    pub total_analyzed: u64,
    pub average_score: f64,
    pub average_confidence: f64,
    pub labels: LabelBreakdown,
    pub confidence_bands: ConfidenceBands,
}

async fn resolve_one(state: &AppState, text: &str) -> Result<AnalyzeResult, SentimentError> {
    let verdict = state.pipeline.resolver().resolve(text).await?;
    let team = state
        .pipeline
        .attributor()
        .attribute(text)
        .team_slug()
        .map(str::to_string);

    Ok(AnalyzeResult {
        label: verdict.label,
        score: verdict.score,
        signed_score: verdict.signed_score(),
        confidence: verdict.confidence,
        model_used: verdict.model_used,
        team,
    })
}

pub(super) async fn analyze_text(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<AnalyzeResult>>, ApiError> {
    let result = resolve_one(&state, &body.text)
        .await
        .map_err(|e| map_sentiment_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(result, req_id.0)))
}

/// Resolve up to 50 texts. A failed text does not fail the batch.
pub(super) async fn analyze_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AnalyzeBatchRequest>,
) -> Result<Json<ApiResponse<BatchResults>>, ApiError> {
    if body.texts.is_empty() || body.texts.len() > MAX_BATCH_TEXTS {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!(
                "texts must hold between 1 and {MAX_BATCH_TEXTS} entries, got {}",
                body.texts.len()
            ),
        ));
    }

    let results: Vec<BatchItem> = stream::iter(body.texts.into_iter().enumerate())
        .map(|(index, text)| {
            let state = state.clone();
            async move { (index, resolve_one(&state, &text).await) }
        })
        .buffered(BATCH_CONCURRENCY)
        .map(|(index, outcome)| match outcome {
            Ok(result) => BatchItem {
                index,
                result: Some(result),
                error: None,
            },
            Err(e) => {
                tracing::warn!(index, error = %e, "batch item failed");
                BatchItem {
                    index,
                    result: None,
                    error: Some(ErrorBody {
                        code: e.kind().to_string(),
                        message: e.to_string(),
                    }),
                }
            }
        })
        .collect()
        .await;

    let success_count = results.iter().filter(|item| item.result.is_some()).count();
    let failed_count = results.len() - success_count;
    tracing::info!(success_count, failed_count, "batch analysis finished");

    Ok(Json(ApiResponse::new(
        BatchResults {
            results,
            success_count,
            failed_count,
        },
        req_id.0,
    )))
}

pub(super) async fn cleanup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CleanupReport>>, ApiError> {
    let report = cleanup_duplicate_verdicts(state.store.as_ref())
        .await
        .map_err(|e| map_analytics_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(report, req_id.0)))
}

pub(super) async fn stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SentimentStats>>, ApiError> {
    let overview = state
        .store
        .sentiment_overview()
        .await
        .map_err(|e: StoreError| map_analytics_error(req_id.0.clone(), &e.into()))?;

    Ok(Json(ApiResponse::new(
        SentimentStats {
            total_analyzed: overview.total,
            average_score: overview.avg_signed_score,
            average_confidence: overview.avg_confidence,
            labels: LabelBreakdown {
                positive: overview.positive,
                negative: overview.negative,
                neutral: overview.neutral,
            },
            confidence_bands: ConfidenceBands {
                high: overview.high_confidence,
                medium: overview.medium_confidence,
                low: overview.low_confidence,
            },
        },
        req_id.0,
    )))
}
