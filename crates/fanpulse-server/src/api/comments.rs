use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fanpulse_analytics::{AnalyticsError, RecordQuery};
use fanpulse_core::{Label, Platform, SourceItem, StoredRecord};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_analytics_error, ApiError, ApiResponse, AppState};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub(super) struct CreateCommentRequest {
    pub source_id: String,
    pub platform: String,
    pub text: String,
    pub author: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
    /// Team slug; skips keyword attribution when set.
    pub team: Option<String>,
}

pub(super) async fn create_comment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StoredRecord>>), ApiError> {
    let source_id = body.source_id.trim();
    if source_id.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "source_id must not be empty",
        ));
    }

    let platform: Platform = body
        .platform
        .parse()
        .map_err(|e: fanpulse_core::CoreError| {
            ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
        })?;

    let item = SourceItem {
        source_id: source_id.to_string(),
        platform,
        text: body.text,
        author: body.author.unwrap_or_default(),
        observed_at: body.observed_at.unwrap_or_else(Utc::now),
    };
    let team = body
        .team
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let record = state
        .pipeline
        .process(&item, team)
        .await
        .map_err(|e| map_analytics_error(req_id.0.clone(), &e))?;

    tracing::info!(
        source_id = %record.item.source_id,
        platform = %record.item.platform,
        team = record.assignment.team_slug().unwrap_or("unassigned"),
        label = record.verdict.label.as_str(),
        "comment ingested"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::new(record, req_id.0))))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CommentsQuery {
    pub team: Option<String>,
    pub platform: Option<String>,
    pub label: Option<String>,
    pub author: Option<String>,
    /// First UTC day to include.
    pub start_date: Option<NaiveDate>,
    /// Last UTC day to include.
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct CommentPage {
    pub comments: Vec<StoredRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl CommentsQuery {
    /// Validate filters and turn page/limit into an offset query.
    fn to_record_query(&self) -> Result<RecordQuery, String> {
        let platform = blank_to_none(self.platform.as_deref())
            .map(str::parse::<Platform>)
            .transpose()
            .map_err(|e| e.to_string())?;
        let label = blank_to_none(self.label.as_deref())
            .map(|l| l.to_ascii_uppercase().parse::<Label>())
            .transpose()
            .map_err(|e| e.to_string())?;

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(format!("start_date {start} is after end_date {end}"));
            }
        }
        let to = self.end_date.and_then(|d| d.succ_opt()).map(day_start);

        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        let page = self.page.unwrap_or(1).max(1);

        Ok(RecordQuery {
            team: blank_to_none(self.team.as_deref()).map(str::to_string),
            platform,
            label,
            author: blank_to_none(self.author.as_deref()).map(str::to_string),
            from: self.start_date.map(day_start),
            to,
            limit,
            offset: u64::from(page - 1) * u64::from(limit),
        })
    }
}

pub(super) async fn list_comments(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<ApiResponse<CommentPage>>, ApiError> {
    let record_query = query
        .to_record_query()
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    if let Some(team) = record_query.team.as_deref() {
        if state.teams.find(team).is_none() {
            return Err(ApiError::new(
                req_id.0,
                "not_found",
                format!("team {team} not found"),
            ));
        }
    }

    let page = state
        .store
        .list_records(&record_query)
        .await
        .map_err(|e| map_analytics_error(req_id.0.clone(), &AnalyticsError::Store(e)))?;

    let limit = record_query.limit;
    Ok(Json(ApiResponse::new(
        CommentPage {
            comments: page.records,
            total: page.total,
            page: query.page.unwrap_or(1).max(1),
            limit,
            total_pages: page.total.div_ceil(u64::from(limit)),
        },
        req_id.0,
    )))
}
