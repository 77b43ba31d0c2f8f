use axum::{body::Bytes, extract::State, Extension, Json};
use serde::de::DeserializeOwned;

use crate::live::{CollectReport, CollectRequest, LiveStartRequest, LiveStatus};
use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

// blank body means "use the defaults"
fn optional_body<T>(body: &Bytes, req_id: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            req_id,
            "validation_error",
            format!("invalid request body: {e}"),
        )
    })
}

/// Start polling. An empty body uses the configured defaults.
pub(super) async fn start(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ApiResponse<LiveStatus>>, ApiError> {
    let request: LiveStartRequest = optional_body(&body, &req_id.0)?;

    let status = state
        .live
        .start(request)
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), e.kind(), e.to_string()))?;

    Ok(Json(ApiResponse::new(status, req_id.0)))
}

/// Fetch every subreddit once, ignoring the polling age cutoff.
pub(super) async fn collect(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ApiResponse<CollectReport>>, ApiError> {
    let request: CollectRequest = optional_body(&body, &req_id.0)?;

    let report = state
        .live
        .collect_once(request)
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), e.kind(), e.to_string()))?;

    Ok(Json(ApiResponse::new(report, req_id.0)))
}

pub(super) async fn stop(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<LiveStatus>> {
    Json(ApiResponse::new(state.live.stop().await, req_id.0))
}

pub(super) async fn status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<LiveStatus>> {
    Json(ApiResponse::new(state.live.status().await, req_id.0))
}
