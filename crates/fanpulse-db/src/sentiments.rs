//! Database operations for the `sentiments` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Per-label counts and the signed score sum for one team over a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, sqlx::FromRow)]
pub struct DailyTallyRow {
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub signed_sum: f64,
}

/// Sentiment rows that all reference the same comment, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DuplicateGroupRow {
    pub comment_id: i64,
    pub sentiment_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct SentimentOverviewRow {
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub avg_signed_score: Option<f64>,
    pub avg_confidence: Option<f64>,
    pub high_confidence: i64,
    pub medium_confidence: i64,
    pub low_confidence: i64,
}

/// Count a team's verdicts created in `[start, end)` and sum their signed scores.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn tally_team_window(
    pool: &PgPool,
    team_slug: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<DailyTallyRow, DbError> {
    let row = sqlx::query_as::<_, DailyTallyRow>(
        "SELECT \
             COUNT(*) FILTER (WHERE label = 'POSITIVE') AS positive, \
             COUNT(*) FILTER (WHERE label = 'NEGATIVE') AS negative, \
             COUNT(*) FILTER (WHERE label = 'NEUTRAL') AS neutral, \
             COALESCE(SUM(CASE label \
                 WHEN 'POSITIVE' THEN score \
                 WHEN 'NEGATIVE' THEN -score \
                 ELSE 0 END), 0)::DOUBLE PRECISION AS signed_sum \
         FROM sentiments \
         WHERE team_slug = $1 AND created_at >= $2 AND created_at < $3",
    )
    .bind(team_slug)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// List every comment that has more than one sentiment row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_duplicate_sentiment_groups(
    pool: &PgPool,
) -> Result<Vec<DuplicateGroupRow>, DbError> {
    let rows = sqlx::query_as::<_, DuplicateGroupRow>(
        "SELECT comment_id, ARRAY_AGG(id ORDER BY id) AS sentiment_ids \
         FROM sentiments \
         GROUP BY comment_id \
         HAVING COUNT(*) > 1 \
         ORDER BY comment_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete sentiment rows by id. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_sentiments(pool: &PgPool, ids: &[i64]) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM sentiments WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Label breakdown and confidence bands across all stored verdicts.
///
/// Bands: high `>= 0.8`, medium `[0.6, 0.8)`, low `< 0.6`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sentiment_overview(pool: &PgPool) -> Result<SentimentOverviewRow, DbError> {
    let row = sqlx::query_as::<_, SentimentOverviewRow>(
        "SELECT \
             COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE label = 'POSITIVE') AS positive, \
             COUNT(*) FILTER (WHERE label = 'NEGATIVE') AS negative, \
             COUNT(*) FILTER (WHERE label = 'NEUTRAL') AS neutral, \
             AVG(CASE label \
                 WHEN 'POSITIVE' THEN score \
                 WHEN 'NEGATIVE' THEN -score \
                 ELSE 0 END)::DOUBLE PRECISION AS avg_signed_score, \
             AVG(confidence)::DOUBLE PRECISION AS avg_confidence, \
             COUNT(*) FILTER (WHERE confidence >= 0.8) AS high_confidence, \
             COUNT(*) FILTER (WHERE confidence >= 0.6 AND confidence < 0.8) AS medium_confidence, \
             COUNT(*) FILTER (WHERE confidence < 0.6) AS low_confidence \
         FROM sentiments",
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}
