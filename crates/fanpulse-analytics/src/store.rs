//! Persistence seam for ingestion and analytics.
//!
//! [`RecordStore`] is the narrow set of operations the engine needs from a
//! document store. [`PgRecordStore`] backs it with Postgres through
//! `fanpulse-db`; [`crate::MemoryStore`] keeps everything in process.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fanpulse_core::{
    EntityAssignment, Label, Platform, SourceItem, SourceKey, StoredRecord, Verdict,
};
use fanpulse_db::{DbError, NewIngestedRecord, RecordFilters, RecordRow};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Db(#[from] DbError),

    #[error("store call timed out after {0}s")]
    Timeout(u64),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Per-label verdict counts and signed score sum over one time window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTally {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub signed_sum: f64,
}

impl DayTally {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.positive + self.negative + self.neutral
    }
}

/// Verdict ids that reference the same comment, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub comment_id: i64,
    pub verdict_ids: Vec<i64>,
}

/// Label breakdown and confidence bands across every stored verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentOverview {
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub avg_signed_score: f64,
    pub avg_confidence: f64,
    pub high_confidence: u64,
    pub medium_confidence: u64,
    pub low_confidence: u64,
}

/// Filters and paging for [`RecordStore::list_records`].
///
/// `author` matches case-insensitively as a substring; `from` is inclusive
/// and `to` exclusive against the record's creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub team: Option<String>,
    pub platform: Option<Platform>,
    pub label: Option<Label>,
    pub author: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u64,
}

/// One page of stored records, newest first, with the unpaged match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordPage {
    pub records: Vec<StoredRecord>,
    pub total: u64,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_record(&self, key: &SourceKey) -> Result<Option<StoredRecord>, StoreError>;

    /// Atomically write the item and its verdict.
    ///
    /// Returns `Ok(None)` when the identity key is already taken; nothing is
    /// written in that case.
    async fn insert_record(
        &self,
        item: &SourceItem,
        assignment: &EntityAssignment,
        verdict: &Verdict,
    ) -> Result<Option<StoredRecord>, StoreError>;

    /// Tally a team's verdicts created in `[start, end)`.
    async fn tally_window(
        &self,
        team_slug: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DayTally, StoreError>;

    async fn duplicate_verdict_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError>;

    async fn delete_verdicts(&self, ids: &[i64]) -> Result<u64, StoreError>;

    async fn sentiment_overview(&self) -> Result<SentimentOverview, StoreError>;

    async fn list_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError>;
}

/// Postgres-backed [`RecordStore`]. Every call is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgRecordStore {
    #[must_use]
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, DbError>> + Send,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout.as_secs()))?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(fanpulse_db::ping(&self.pool)).await
    }

    async fn find_record(&self, key: &SourceKey) -> Result<Option<StoredRecord>, StoreError> {
        let row = self
            .bounded(fanpulse_db::find_record_by_source(
                &self.pool,
                &key.source_id,
                key.platform.as_str(),
            ))
            .await?;
        row.map(RecordRow::into_stored_record)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn insert_record(
        &self,
        item: &SourceItem,
        assignment: &EntityAssignment,
        verdict: &Verdict,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let record = NewIngestedRecord {
            item,
            team_slug: assignment.team_slug(),
            verdict,
        };
        let row = self
            .bounded(fanpulse_db::insert_ingested_record(&self.pool, &record))
            .await?;
        row.map(RecordRow::into_stored_record)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn tally_window(
        &self,
        team_slug: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DayTally, StoreError> {
        let row = self
            .bounded(fanpulse_db::tally_team_window(&self.pool, team_slug, start, end))
            .await?;
        Ok(DayTally {
            positive: count(row.positive),
            negative: count(row.negative),
            neutral: count(row.neutral),
            signed_sum: row.signed_sum,
        })
    }

    async fn duplicate_verdict_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError> {
        let rows = self
            .bounded(fanpulse_db::list_duplicate_sentiment_groups(&self.pool))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| DuplicateGroup {
                comment_id: row.comment_id,
                verdict_ids: row.sentiment_ids,
            })
            .collect())
    }

    async fn delete_verdicts(&self, ids: &[i64]) -> Result<u64, StoreError> {
        self.bounded(fanpulse_db::delete_sentiments(&self.pool, ids))
            .await
    }

    async fn sentiment_overview(&self) -> Result<SentimentOverview, StoreError> {
        let row = self
            .bounded(fanpulse_db::sentiment_overview(&self.pool))
            .await?;
        Ok(SentimentOverview {
            total: count(row.total),
            positive: count(row.positive),
            negative: count(row.negative),
            neutral: count(row.neutral),
            avg_signed_score: row.avg_signed_score.unwrap_or(0.0),
            avg_confidence: row.avg_confidence.unwrap_or(0.0),
            high_confidence: count(row.high_confidence),
            medium_confidence: count(row.medium_confidence),
            low_confidence: count(row.low_confidence),
        })
    }

    async fn list_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
        let filters = RecordFilters {
            team_slug: query.team.as_deref(),
            platform: query.platform.map(Platform::as_str),
            label: query.label.map(Label::as_str),
            author: query.author.as_deref(),
            from: query.from,
            to: query.to,
        };
        let limit = i64::from(query.limit);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let (rows, total) = self
            .bounded(async {
                let rows = fanpulse_db::list_records(&self.pool, filters, limit, offset).await?;
                let total = fanpulse_db::count_records(&self.pool, filters).await?;
                Ok::<_, DbError>((rows, total))
            })
            .await?;

        let records = rows
            .into_iter()
            .map(RecordRow::into_stored_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RecordPage {
            records,
            total: count(total),
        })
    }
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
