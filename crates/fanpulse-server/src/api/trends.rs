use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use fanpulse_analytics::{analyze_period, rank_insights, Insight, Period, TeamTrend, TrendAnalysis};
use fanpulse_core::TeamConfig;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_analytics_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct PeriodQuery {
    pub period: Option<String>,
}

impl PeriodQuery {
    fn period(&self) -> Period {
        Period::from_param(self.period.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub(super) struct InsightsData {
    pub period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub insights: Vec<Insight>,
}

async fn analyze(
    state: &AppState,
    teams: &[TeamConfig],
    period: Period,
    req_id: &str,
) -> Result<TrendAnalysis, ApiError> {
    analyze_period(&state.bucketer, teams, period, Utc::now().date_naive())
        .await
        .map_err(|e| map_analytics_error(req_id.to_string(), &e))
}

fn find_team<'a>(
    state: &'a AppState,
    slug: &str,
    req_id: &str,
) -> Result<&'a TeamConfig, ApiError> {
    state
        .teams
        .find(slug)
        .ok_or_else(|| ApiError::new(req_id, "not_found", format!("team {slug} not found")))
}

/// Tracked teams ordered by display name.
pub(super) async fn list_teams(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<TeamConfig>>> {
    let mut teams = state.teams.teams.clone();
    teams.sort_by(|a, b| a.name.cmp(&b.name));
    Json(ApiResponse::new(teams, req_id.0))
}

pub(super) async fn list_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<TrendAnalysis>>, ApiError> {
    let analysis = analyze(&state, &state.teams.teams, query.period(), &req_id.0).await?;
    Ok(Json(ApiResponse::new(analysis, req_id.0)))
}

pub(super) async fn list_insights(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<InsightsData>>, ApiError> {
    let period = query.period();
    let analysis = analyze(&state, &state.teams.teams, period, &req_id.0).await?;

    Ok(Json(ApiResponse::new(
        InsightsData {
            period,
            team: None,
            generated_at: Utc::now(),
            insights: rank_insights(&analysis),
        },
        req_id.0,
    )))
}

pub(super) async fn list_team_insights(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<InsightsData>>, ApiError> {
    let team = find_team(&state, &slug, &req_id.0)?.clone();
    let period = query.period();
    let analysis = analyze(&state, std::slice::from_ref(&team), period, &req_id.0).await?;

    Ok(Json(ApiResponse::new(
        InsightsData {
            period,
            team: Some(team.slug),
            generated_at: Utc::now(),
            insights: rank_insights(&analysis),
        },
        req_id.0,
    )))
}

pub(super) async fn get_team_trend(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<TeamTrend>>, ApiError> {
    let team = find_team(&state, &slug, &req_id.0)?;

    let trend = state
        .bucketer
        .team_trend(team, query.period(), Utc::now().date_naive())
        .await
        .map_err(|e| map_analytics_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(trend, req_id.0)))
}
