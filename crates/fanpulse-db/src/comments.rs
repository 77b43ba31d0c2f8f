//! Database operations for the `comments` table and its first verdict.

use chrono::{DateTime, Utc};
use fanpulse_core::{EntityAssignment, SourceItem, StoredRecord, Verdict};
use sqlx::PgPool;

use crate::DbError;

/// A comment joined with its earliest sentiment row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub comment_id: i64,
    pub source_id: String,
    pub source_platform: String,
    pub author: String,
    pub text: String,
    pub observed_at: DateTime<Utc>,
    pub team_slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub verdict_id: i64,
    pub label: String,
    pub score: f64,
    pub confidence: f64,
    pub model_used: String,
    pub produced_at: DateTime<Utc>,
}

impl RecordRow {
    /// Convert the raw row into the domain record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidValue`] if a stored enum column holds an
    /// unrecognised value.
    pub fn into_stored_record(self) -> Result<StoredRecord, DbError> {
        let platform = self
            .source_platform
            .parse()
            .map_err(|e: fanpulse_core::CoreError| DbError::InvalidValue(e.to_string()))?;
        let label = self
            .label
            .parse()
            .map_err(|e: fanpulse_core::CoreError| DbError::InvalidValue(e.to_string()))?;
        let model_used = self
            .model_used
            .parse()
            .map_err(|e: fanpulse_core::CoreError| DbError::InvalidValue(e.to_string()))?;

        Ok(StoredRecord {
            comment_id: self.comment_id,
            verdict_id: self.verdict_id,
            item: SourceItem {
                source_id: self.source_id,
                platform,
                text: self.text,
                author: self.author,
                observed_at: self.observed_at,
            },
            assignment: EntityAssignment::from_slug(self.team_slug),
            verdict: Verdict::new(
                label,
                self.score,
                self.confidence,
                model_used,
                self.produced_at,
            ),
            created_at: self.created_at,
        })
    }
}

/// Borrowed input for [`insert_ingested_record`].
pub struct NewIngestedRecord<'a> {
    pub item: &'a SourceItem,
    pub team_slug: Option<&'a str>,
    pub verdict: &'a Verdict,
}

const RECORD_COLUMNS: &str = "c.id AS comment_id, c.source_id, c.source_platform, c.author, \
     c.text, c.observed_at, c.team_slug, c.created_at, \
     s.id AS verdict_id, s.label, s.score, s.confidence, s.model_used, s.produced_at";

/// Look up a record by its source identity key.
///
/// When historical duplicate verdicts exist the lowest verdict id is returned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_record_by_source(
    pool: &PgPool,
    source_id: &str,
    source_platform: &str,
) -> Result<Option<RecordRow>, DbError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} \
         FROM comments c \
         JOIN LATERAL ( \
             SELECT id, label, score, confidence, model_used, produced_at \
             FROM sentiments \
             WHERE comment_id = c.id \
             ORDER BY id \
             LIMIT 1 \
         ) s ON TRUE \
         WHERE c.source_id = $1 AND c.source_platform = $2"
    );

    let row = sqlx::query_as::<_, RecordRow>(&sql)
        .bind(source_id)
        .bind(source_platform)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Insert a comment and its verdict in one transaction.
///
/// Returns `None` when a comment with the same `(source_id, source_platform)`
/// already exists; nothing is written in that case.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either insert fails.
pub async fn insert_ingested_record(
    pool: &PgPool,
    record: &NewIngestedRecord<'_>,
) -> Result<Option<RecordRow>, DbError> {
    let mut tx = pool.begin().await?;

    let inserted: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
        "INSERT INTO comments \
             (source_id, source_platform, author, text, observed_at, team_slug) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (source_id, source_platform) DO NOTHING \
         RETURNING id, created_at",
    )
    .bind(&record.item.source_id)
    .bind(record.item.platform.as_str())
    .bind(&record.item.author)
    .bind(&record.item.text)
    .bind(record.item.observed_at)
    .bind(record.team_slug)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((comment_id, created_at)) = inserted else {
        tx.rollback().await?;
        return Ok(None);
    };

    let verdict = record.verdict;
    let verdict_id: i64 = sqlx::query_scalar(
        "INSERT INTO sentiments \
             (comment_id, team_slug, label, score, confidence, model_used, produced_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(comment_id)
    .bind(record.team_slug)
    .bind(verdict.label.as_str())
    .bind(verdict.score)
    .bind(verdict.confidence)
    .bind(verdict.model_used.as_str())
    .bind(verdict.produced_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(RecordRow {
        comment_id,
        source_id: record.item.source_id.clone(),
        source_platform: record.item.platform.as_str().to_string(),
        author: record.item.author.clone(),
        text: record.item.text.clone(),
        observed_at: record.item.observed_at,
        team_slug: record.team_slug.map(str::to_string),
        created_at,
        verdict_id,
        label: verdict.label.as_str().to_string(),
        score: verdict.score,
        confidence: verdict.confidence,
        model_used: verdict.model_used.as_str().to_string(),
        produced_at: verdict.produced_at,
    }))
}

/// Optional filters for [`list_records`] and [`count_records`].
///
/// `author` is a case-insensitive substring match. `from` is inclusive and
/// `to` exclusive, both against the comment's `created_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFilters<'a> {
    pub team_slug: Option<&'a str>,
    pub platform: Option<&'a str>,
    pub label: Option<&'a str>,
    pub author: Option<&'a str>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

const RECORD_FROM: &str = "FROM comments c \
     JOIN LATERAL ( \
         SELECT id, label, score, confidence, model_used, produced_at \
         FROM sentiments \
         WHERE comment_id = c.id \
         ORDER BY id \
         LIMIT 1 \
     ) s ON TRUE \
     WHERE ($1::TEXT IS NULL OR c.team_slug = $1) \
       AND ($2::TEXT IS NULL OR c.source_platform = $2) \
       AND ($3::TEXT IS NULL OR s.label = $3) \
       AND ($4::TEXT IS NULL OR strpos(lower(c.author), lower($4)) > 0) \
       AND ($5::timestamptz IS NULL OR c.created_at >= $5) \
       AND ($6::timestamptz IS NULL OR c.created_at < $6)";

/// One page of records matching `filters`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_records(
    pool: &PgPool,
    filters: RecordFilters<'_>,
    limit: i64,
    offset: i64,
) -> Result<Vec<RecordRow>, DbError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} {RECORD_FROM} \
         ORDER BY c.created_at DESC, c.id DESC \
         LIMIT $7 OFFSET $8"
    );

    let rows = sqlx::query_as::<_, RecordRow>(&sql)
        .bind(filters.team_slug)
        .bind(filters.platform)
        .bind(filters.label)
        .bind(filters.author)
        .bind(filters.from)
        .bind(filters.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Number of records matching `filters`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_records(pool: &PgPool, filters: RecordFilters<'_>) -> Result<i64, DbError> {
    let sql = format!("SELECT COUNT(*) {RECORD_FROM}");

    let total = sqlx::query_scalar::<_, i64>(&sql)
        .bind(filters.team_slug)
        .bind(filters.platform)
        .bind(filters.label)
        .bind(filters.author)
        .bind(filters.from)
        .bind(filters.to)
        .fetch_one(pool)
        .await?;

    Ok(total)
}
