mod comments;
mod live;
mod sentiment;
mod trends;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use fanpulse_analytics::{AnalyticsError, IngestPipeline, RecordStore, TrendBucketer};
use fanpulse_core::TeamsFile;
use fanpulse_sentiment::SentimentError;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::live::LivePoller;
use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub pipeline: Arc<IngestPipeline>,
    pub bucketer: TrendBucketer,
    pub teams: Arc<TeamsFile>,
    pub live: LivePoller,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
    #[serde(skip)]
    status: Option<StatusCode>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    store: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
            status: None,
        }
    }

    /// Override the status derived from the error code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    fn status(&self) -> StatusCode {
        if let Some(status) = self.status {
            return status;
        }
        match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" | "duplicate_item" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "analysis_unavailable" | "store_unavailable" | "backend_unavailable" => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

pub(super) fn map_analytics_error(request_id: String, error: &AnalyticsError) -> ApiError {
    match error {
        AnalyticsError::Store(e) => {
            tracing::error!(error = %e, "store operation failed");
            return ApiError::new(request_id, error.kind(), "store unavailable");
        }
        AnalyticsError::Sentiment(e) => return map_sentiment_error(request_id, e),
        AnalyticsError::DuplicateItem(_) => tracing::debug!(error = %error, "duplicate item"),
        _ => tracing::info!(error = %error, "request rejected"),
    }

    let api_error = ApiError::new(request_id, error.kind(), error.to_string());
    if matches!(error, AnalyticsError::Unattributed) {
        api_error.with_status(StatusCode::UNPROCESSABLE_ENTITY)
    } else {
        api_error
    }
}

pub(super) fn map_sentiment_error(request_id: String, error: &SentimentError) -> ApiError {
    if matches!(error, SentimentError::InvalidInput(_)) {
        tracing::info!(error = %error, "invalid sentiment input");
    } else {
        tracing::warn!(error = %error, "sentiment analysis failed");
    }
    ApiError::new(request_id, error.kind(), error.to_string())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/sentiment/analyze", post(sentiment::analyze_text))
        .route(
            "/api/v1/sentiment/analyze/batch",
            post(sentiment::analyze_batch),
        )
        .route("/api/v1/sentiment/cleanup", post(sentiment::cleanup))
        .route("/api/v1/sentiment/stats", get(sentiment::stats))
        .route(
            "/api/v1/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/api/v1/trends", get(trends::list_trends))
        .route("/api/v1/trends/insights", get(trends::list_insights))
        .route(
            "/api/v1/trends/insights/{slug}",
            get(trends::list_team_insights),
        )
        .route("/api/v1/teams", get(trends::list_teams))
        .route("/api/v1/teams/{slug}/trend", get(trends::get_team_trend))
        .route("/api/v1/live/start", post(live::start))
        .route("/api/v1/live/stop", post(live::stop))
        .route("/api/v1/live/status", get(live::status))
        .route("/api/v1/reddit/collect", post(live::collect))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::new(
                HealthData {
                    status: "ok",
                    store: "ok",
                },
                req_id.0,
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        store: "unavailable",
                    },
                    req_id.0,
                )),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use fanpulse_analytics::MemoryStore;
    use fanpulse_core::{EntityAssignment, Label, Platform, Provenance, SourceItem, Verdict};
    use fanpulse_sentiment::RedditClient;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::live::LiveDefaults;
    use crate::test_support;

    type Outcome = Option<(Label, f64)>;

    fn app_with(store: Arc<MemoryStore>, a: Outcome, b: Outcome, auth: AuthState) -> Router {
        let teams = Arc::new(test_support::teams());
        let pipeline = Arc::new(test_support::pipeline(store.clone(), a, b));
        let reddit = RedditClient::with_base_url(
            "http://127.0.0.1:9",
            "fanpulse-test",
            Duration::from_secs(1),
        )
        .expect("reddit client");
        let live = LivePoller::new(
            Arc::clone(&pipeline),
            Arc::new(reddit),
            LiveDefaults::new(&teams.teams, Duration::from_secs(300), 25),
        );
        let store: Arc<dyn RecordStore> = store;
        let state = AppState {
            bucketer: TrendBucketer::new(Arc::clone(&store)),
            store,
            pipeline,
            teams,
            live,
        };
        build_app(state, auth, default_rate_limit_state())
    }

    fn app(store: Arc<MemoryStore>) -> Router {
        app_with(
            store,
            Some((Label::Positive, 0.6)),
            Some((Label::Positive, 0.8)),
            AuthState::disabled(),
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let json = serde_json::from_slice(&body).expect("json body");
        (status, json)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn seed(store: &MemoryStore, id: &str, team: &str, label: Label) {
        let item = SourceItem {
            source_id: id.to_string(),
            platform: Platform::Reddit,
            text: format!("{team} yorum"),
            author: "fan".to_string(),
            observed_at: Utc::now(),
        };
        let verdict = Verdict::new(label, 0.9, 0.9, Provenance::HybridConsensus, Utc::now());
        store
            .insert_at(
                &item,
                &EntityAssignment::Team(team.to_string()),
                &verdict,
                Utc::now(),
            )
            .expect("seeded");
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_status_override_wins() {
        let response = ApiError::new("req-1", "validation_error", "no team")
            .with_status(StatusCode::UNPROCESSABLE_ENTITY)
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unavailable_codes_map_to_service_unavailable() {
        for code in ["analysis_unavailable", "store_unavailable", "backend_unavailable"] {
            let response = ApiError::new("req-1", code, "down").into_response();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{code}");
        }
    }

    #[tokio::test]
    async fn health_reports_ok_and_echoes_request_id() {
        let app = app(Arc::new(MemoryStore::new()));
        let request = Request::builder()
            .uri("/api/v1/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("req-42")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["meta"]["request_id"], "req-42");
    }

    #[tokio::test]
    async fn health_degrades_when_store_is_down() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);

        let (status, json) = send(app(store), get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["data"]["status"], "degraded");
        assert_eq!(json["data"]["store"], "unavailable");
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let auth = AuthState::from_keys("secret", false).unwrap();
        let app = app_with(
            Arc::new(MemoryStore::new()),
            Some((Label::Neutral, 0.5)),
            None,
            auth,
        );

        let (status, json) = send(app.clone(), get_req("/api/v1/live/status")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "unauthorized");

        let request = Request::builder()
            .uri("/api/v1/live/status")
            .header("authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(app, get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn create_comment_inserts_then_rejects_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone());
        let body = json!({
            "source_id": "t3_abc",
            "platform": "reddit",
            "text": "Cimbom bu sezon çok iyi",
            "author": "sarikirmizi"
        });

        let (status, json) = send(app.clone(), post_json("/api/v1/comments", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["assignment"]["team"], "galatasaray");
        assert_eq!(json["data"]["verdict"]["label"], "POSITIVE");
        assert_eq!(json["data"]["verdict"]["model_used"], "hybrid-consensus");

        let (status, json) = send(app, post_json("/api/v1/comments", &body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "duplicate_item");
        assert_eq!(store.comment_count(), 1);
    }

    #[tokio::test]
    async fn create_comment_without_team_is_unprocessable() {
        let body = json!({
            "source_id": "1",
            "platform": "reddit",
            "text": "Basketbol finali heyecanlıydı"
        });
        let (status, json) = send(
            app(Arc::new(MemoryStore::new())),
            post_json("/api/v1/comments", &body),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn create_comment_validates_fields() {
        let app = app(Arc::new(MemoryStore::new()));

        let bad_platform = json!({ "source_id": "1", "platform": "myspace", "text": "Cimbom" });
        let (status, json) = send(app.clone(), post_json("/api/v1/comments", &bad_platform)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");

        let blank_id = json!({ "source_id": " ", "platform": "reddit", "text": "Cimbom" });
        let (status, _) = send(app.clone(), post_json("/api/v1/comments", &blank_id)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown_team =
            json!({ "source_id": "2", "platform": "reddit", "text": "derbi", "team": "altay" });
        let (status, json) = send(app, post_json("/api/v1/comments", &unknown_team)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn analyze_returns_verdict_without_storing() {
        let store = Arc::new(MemoryStore::new());
        let (status, json) = send(
            app(store.clone()),
            post_json(
                "/api/v1/sentiment/analyze",
                &json!({ "text": "Kanarya bugün uçtu" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["label"], "POSITIVE");
        assert_eq!(json["data"]["team"], "fenerbahce");
        assert_eq!(json["data"]["model_used"], "hybrid-consensus");
        assert_eq!(store.comment_count(), 0);
    }

    #[tokio::test]
    async fn analyze_rejects_empty_text() {
        let (status, json) = send(
            app(Arc::new(MemoryStore::new())),
            post_json("/api/v1/sentiment/analyze", &json!({ "text": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn analyze_reports_unavailable_when_both_backends_fail() {
        let app = app_with(
            Arc::new(MemoryStore::new()),
            None,
            None,
            AuthState::disabled(),
        );
        let (status, json) = send(
            app,
            post_json("/api/v1/sentiment/analyze", &json!({ "text": "Cimbom" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "analysis_unavailable");
    }

    #[tokio::test]
    async fn trends_cover_every_team_and_day() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "1", "galatasaray", Label::Positive);
        seed(&store, "2", "galatasaray", Label::Negative);

        let (status, json) = send(app(store), get_req("/api/v1/trends?period=7d")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["period"], "7d");
        assert_eq!(json["data"]["teams"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["data"]["teams"][0]["data"].as_array().map(Vec::len), Some(7));
        assert_eq!(json["data"]["teams"][0]["overall"]["total_comments"], 2);
        assert_eq!(json["data"]["summary"]["total_comments"], 2);
    }

    #[tokio::test]
    async fn team_trend_uses_requested_period() {
        let (status, json) = send(
            app(Arc::new(MemoryStore::new())),
            get_req("/api/v1/teams/fenerbahce/trend?period=30d"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["team"], "fenerbahce");
        assert_eq!(json["data"]["team_name"], "Fenerbahçe");
        assert_eq!(json["data"]["data"].as_array().map(Vec::len), Some(30));
        assert_eq!(json["data"]["overall"]["insufficient_data"], true);
    }

    #[tokio::test]
    async fn team_trend_unknown_slug_is_not_found() {
        let (status, json) = send(
            app(Arc::new(MemoryStore::new())),
            get_req("/api/v1/teams/altay/trend"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn trends_fail_when_store_is_down() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let (status, json) = send(app(store), get_req("/api/v1/trends")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "store_unavailable");
    }

    #[tokio::test]
    async fn insights_include_activity_summary() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "1", "galatasaray", Label::Positive);

        let (status, json) = send(app(store), get_req("/api/v1/trends/insights")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["period"], "7d");
        let insights = json["data"]["insights"].as_array().expect("insights array");
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0]["type"], "trend");
        assert_eq!(insights[0]["value"], "1 comments");
    }

    #[tokio::test]
    async fn stats_summarise_labels_and_bands() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "1", "galatasaray", Label::Positive);
        seed(&store, "2", "fenerbahce", Label::Negative);
        seed(&store, "3", "fenerbahce", Label::Positive);

        let (status, json) = send(app(store), get_req("/api/v1/sentiment/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total_analyzed"], 3);
        assert_eq!(json["data"]["labels"]["positive"], 2);
        assert_eq!(json["data"]["labels"]["negative"], 1);
        assert_eq!(json["data"]["confidence_bands"]["high"], 3);
    }

    #[tokio::test]
    async fn cleanup_on_clean_store_removes_nothing() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "1", "galatasaray", Label::Positive);

        let (status, json) = send(
            app(store),
            Request::builder()
                .method("POST")
                .uri("/api/v1/sentiment/cleanup")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["records_removed"], 0);
        assert_eq!(json["data"]["errors"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn live_status_and_idle_stop() {
        let app = app(Arc::new(MemoryStore::new()));

        let (status, json) = send(app.clone(), get_req("/api/v1/live/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["running"], false);
        assert_eq!(json["data"]["subreddits"], json!(["galatasaray", "fenerbahce"]));

        let (status, json) = send(
            app,
            Request::builder()
                .method("POST")
                .uri("/api/v1/live/stop")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["running"], false);
    }

    #[tokio::test]
    async fn live_start_validates_interval() {
        let (status, json) = send(
            app(Arc::new(MemoryStore::new())),
            post_json("/api/v1/live/start", &json!({ "interval_secs": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn list_comments_filters_and_pages() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "1", "galatasaray", Label::Positive);
        seed(&store, "2", "fenerbahce", Label::Negative);
        seed(&store, "3", "fenerbahce", Label::Positive);
        let app = app(store);

        let (status, json) = send(
            app.clone(),
            get_req("/api/v1/comments?team=fenerbahce&limit=1&page=2"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 2);
        assert_eq!(json["data"]["page"], 2);
        assert_eq!(json["data"]["limit"], 1);
        assert_eq!(json["data"]["total_pages"], 2);
        assert_eq!(json["data"]["comments"].as_array().map(Vec::len), Some(1));

        let (status, json) = send(
            app.clone(),
            get_req("/api/v1/comments?label=negative&author=FAN"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 1);
        assert_eq!(json["data"]["limit"], 20);

        let (status, json) = send(app.clone(), get_req("/api/v1/comments?team=altay")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");

        let (status, json) = send(app, get_req("/api/v1/comments?platform=myspace")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn list_comments_fails_when_store_is_down() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let (status, json) = send(app(store), get_req("/api/v1/comments")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "store_unavailable");
    }

    #[tokio::test]
    async fn teams_are_listed_by_name() {
        let app = app(Arc::new(MemoryStore::new()));
        let (status, json) = send(app, get_req("/api/v1/teams")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["slug"], "fenerbahce");
        assert_eq!(json["data"][1]["slug"], "galatasaray");
        assert_eq!(json["data"][1]["subreddits"], json!(["galatasaray"]));
    }

    #[tokio::test]
    async fn batch_analyze_reports_each_text() {
        let store = Arc::new(MemoryStore::new());
        let body = json!({ "texts": ["Cimbom bugün harikaydı", "   ", "Kanarya uçtu"] });
        let (status, json) = send(
            app(store.clone()),
            post_json("/api/v1/sentiment/analyze/batch", &body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["success_count"], 2);
        assert_eq!(json["data"]["failed_count"], 1);
        let results = json["data"]["results"].as_array().expect("results array");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["index"], 0);
        assert_eq!(results[0]["result"]["team"], "galatasaray");
        assert_eq!(results[1]["result"], Value::Null);
        assert_eq!(results[1]["error"]["code"], "validation_error");
        assert_eq!(results[2]["result"]["team"], "fenerbahce");
        assert_eq!(store.comment_count(), 0);
    }

    #[tokio::test]
    async fn batch_analyze_rejects_empty_and_oversized_batches() {
        let app = app(Arc::new(MemoryStore::new()));

        let (status, json) = send(
            app.clone(),
            post_json("/api/v1/sentiment/analyze/batch", &json!({ "texts": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");

        let texts = vec!["Cimbom"; 51];
        let (status, _) = send(
            app,
            post_json("/api/v1/sentiment/analyze/batch", &json!({ "texts": texts })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn team_insights_are_scoped_to_one_team() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "1", "galatasaray", Label::Positive);
        seed(&store, "2", "fenerbahce", Label::Negative);
        let app = app(store);

        let (status, json) = send(
            app.clone(),
            get_req("/api/v1/trends/insights/galatasaray?period=30d"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["team"], "galatasaray");
        assert_eq!(json["data"]["period"], "30d");
        let insights = json["data"]["insights"].as_array().expect("insights array");
        assert!(insights.iter().all(|i| i["team"] != "fenerbahce"));

        let (_, json) = send(app.clone(), get_req("/api/v1/trends/insights")).await;
        assert!(json["data"].get("team").is_none());

        let (status, json) = send(app, get_req("/api/v1/trends/insights/altay")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn reddit_collect_reports_unreachable_subreddits() {
        let store = Arc::new(MemoryStore::new());
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/reddit/collect")
            .body(Body::empty())
            .unwrap();

        let (status, json) = send(app(store.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["subreddits"], json!(["galatasaray", "fenerbahce"]));
        assert_eq!(json["data"]["collected"], 0);
        assert_eq!(json["data"]["errors"].as_array().map(Vec::len), Some(2));
        assert_eq!(store.comment_count(), 0);
    }

    #[tokio::test]
    async fn reddit_collect_rejects_malformed_body() {
        let (status, json) = send(
            app(Arc::new(MemoryStore::new())),
            post_json("/api/v1/reddit/collect", &json!({ "limit": "lots" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }
}
