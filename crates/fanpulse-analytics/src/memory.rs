//! In-process [`RecordStore`] used by tests and local tooling.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fanpulse_core::{EntityAssignment, Label, SourceItem, SourceKey, StoredRecord, Verdict};

use crate::store::{
    DayTally, DuplicateGroup, RecordPage, RecordQuery, RecordStore, SentimentOverview, StoreError,
};

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    item: SourceItem,
    assignment: EntityAssignment,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct VerdictRow {
    id: i64,
    comment_id: i64,
    team_slug: Option<String>,
    verdict: Verdict,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    comments: Vec<CommentRow>,
    verdicts: Vec<VerdictRow>,
    last_comment_id: i64,
    last_verdict_id: i64,
    unavailable: bool,
    locked_verdicts: Vec<i64>,
}

impl State {
    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }

    fn record_for(&self, comment: &CommentRow) -> Option<StoredRecord> {
        let verdict = self
            .verdicts
            .iter()
            .filter(|v| v.comment_id == comment.id)
            .min_by_key(|v| v.id)?;
        Some(StoredRecord {
            comment_id: comment.id,
            verdict_id: verdict.id,
            item: comment.item.clone(),
            assignment: comment.assignment.clone(),
            verdict: verdict.verdict.clone(),
            created_at: comment.created_at,
        })
    }

    fn push_verdict(
        &mut self,
        comment_id: i64,
        team_slug: Option<String>,
        verdict: Verdict,
        created_at: DateTime<Utc>,
    ) -> i64 {
        self.last_verdict_id += 1;
        self.verdicts.push(VerdictRow {
            id: self.last_verdict_id,
            comment_id,
            team_slug,
            verdict,
            created_at,
        });
        self.last_verdict_id
    }
}

/// A [`RecordStore`] that keeps comments and verdicts in memory.
///
/// Mirrors the Postgres semantics the engine relies on: the identity key is
/// unique, one insert writes a comment and its verdict together, and verdict
/// rows are not unique per comment.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Make any delete that touches verdict `id` fail, leaving the rest of
    /// the store usable.
    pub fn lock_verdict(&self, id: i64) {
        self.lock().locked_verdicts.push(id);
    }

    /// Insert with an explicit creation time. Returns `None` on an identity
    /// key conflict.
    pub fn insert_at(
        &self,
        item: &SourceItem,
        assignment: &EntityAssignment,
        verdict: &Verdict,
        created_at: DateTime<Utc>,
    ) -> Option<StoredRecord> {
        let mut state = self.lock();
        let key = item.key();
        if state.comments.iter().any(|c| c.item.key() == key) {
            return None;
        }

        state.last_comment_id += 1;
        let comment = CommentRow {
            id: state.last_comment_id,
            item: item.clone(),
            assignment: assignment.clone(),
            created_at,
        };
        state.push_verdict(
            comment.id,
            assignment.team_slug().map(str::to_string),
            verdict.clone(),
            created_at,
        );
        let record = state.record_for(&comment);
        state.comments.push(comment);
        record
    }

    /// Attach one more verdict row to an existing comment, the way historical
    /// double-writes left them. Returns the new verdict id.
    pub fn push_extra_verdict(&self, comment_id: i64, verdict: &Verdict) -> Option<i64> {
        let mut state = self.lock();
        let comment = state.comments.iter().find(|c| c.id == comment_id)?;
        let team_slug = comment.assignment.team_slug().map(str::to_string);
        let created_at = comment.created_at;
        Some(state.push_verdict(comment_id, team_slug, verdict.clone(), created_at))
    }

    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.lock().comments.len()
    }

    #[must_use]
    pub fn verdict_count(&self) -> usize {
        self.lock().verdicts.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().check()
    }

    async fn find_record(&self, key: &SourceKey) -> Result<Option<StoredRecord>, StoreError> {
        let state = self.lock();
        state.check()?;
        Ok(state
            .comments
            .iter()
            .find(|c| c.item.key() == *key)
            .and_then(|c| state.record_for(c)))
    }

    async fn insert_record(
        &self,
        item: &SourceItem,
        assignment: &EntityAssignment,
        verdict: &Verdict,
    ) -> Result<Option<StoredRecord>, StoreError> {
        self.lock().check()?;
        Ok(self.insert_at(item, assignment, verdict, Utc::now()))
    }

    async fn tally_window(
        &self,
        team_slug: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DayTally, StoreError> {
        let state = self.lock();
        state.check()?;
        let mut tally = DayTally::default();
        for row in state.verdicts.iter().filter(|v| {
            v.team_slug.as_deref() == Some(team_slug) && v.created_at >= start && v.created_at < end
        }) {
            match row.verdict.label {
                Label::Positive => tally.positive += 1,
                Label::Negative => tally.negative += 1,
                Label::Neutral => tally.neutral += 1,
            }
            tally.signed_sum += row.verdict.signed_score();
        }
        Ok(tally)
    }

    async fn duplicate_verdict_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError> {
        let state = self.lock();
        state.check()?;
        let mut groups: Vec<DuplicateGroup> = Vec::new();
        for comment in &state.comments {
            let mut ids: Vec<i64> = state
                .verdicts
                .iter()
                .filter(|v| v.comment_id == comment.id)
                .map(|v| v.id)
                .collect();
            if ids.len() > 1 {
                ids.sort_unstable();
                groups.push(DuplicateGroup {
                    comment_id: comment.id,
                    verdict_ids: ids,
                });
            }
        }
        Ok(groups)
    }

    async fn delete_verdicts(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut state = self.lock();
        state.check()?;
        if let Some(id) = ids.iter().find(|id| state.locked_verdicts.contains(id)) {
            return Err(StoreError::Unavailable(format!("verdict {id} is locked")));
        }
        let before = state.verdicts.len();
        state.verdicts.retain(|v| !ids.contains(&v.id));
        Ok((before - state.verdicts.len()) as u64)
    }

    async fn sentiment_overview(&self) -> Result<SentimentOverview, StoreError> {
        let state = self.lock();
        state.check()?;
        let mut overview = SentimentOverview::default();
        let mut signed_sum = 0.0;
        let mut confidence_sum = 0.0;
        for row in &state.verdicts {
            let verdict = &row.verdict;
            overview.total += 1;
            match verdict.label {
                Label::Positive => overview.positive += 1,
                Label::Negative => overview.negative += 1,
                Label::Neutral => overview.neutral += 1,
            }
            if verdict.confidence >= 0.8 {
                overview.high_confidence += 1;
            } else if verdict.confidence >= 0.6 {
                overview.medium_confidence += 1;
            } else {
                overview.low_confidence += 1;
            }
            signed_sum += verdict.signed_score();
            confidence_sum += verdict.confidence;
        }
        if overview.total > 0 {
            #[allow(clippy::cast_precision_loss)]
            let total = overview.total as f64;
            overview.avg_signed_score = signed_sum / total;
            overview.avg_confidence = confidence_sum / total;
        }
        Ok(overview)
    }

    async fn list_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
        let state = self.lock();
        state.check()?;
        let author = query.author.as_deref().map(str::to_lowercase);

        let mut matched: Vec<StoredRecord> = state
            .comments
            .iter()
            .filter(|c| {
                query
                    .team
                    .as_deref()
                    .is_none_or(|team| c.assignment.team_slug() == Some(team))
                    && query.platform.is_none_or(|p| c.item.platform == p)
                    && author
                        .as_deref()
                        .is_none_or(|a| c.item.author.to_lowercase().contains(a))
                    && query.from.is_none_or(|from| c.created_at >= from)
                    && query.to.is_none_or(|to| c.created_at < to)
            })
            .filter_map(|c| state.record_for(c))
            .filter(|r| query.label.is_none_or(|label| r.verdict.label == label))
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.comment_id.cmp(&a.comment_id))
        });

        let total = matched.len() as u64;
        let records = matched
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .collect();
        Ok(RecordPage { records, total })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use fanpulse_core::{Platform, Provenance};

    use super::*;

    fn item(id: &str) -> SourceItem {
        SourceItem {
            source_id: id.to_string(),
            platform: Platform::Reddit,
            text: "Cimbom kazandı".to_string(),
            author: "fan".to_string(),
            observed_at: Utc::now(),
        }
    }

    fn verdict(label: Label, score: f64) -> Verdict {
        Verdict::new(label, score, score, Provenance::AOnly, Utc::now())
    }

    fn team(slug: &str) -> EntityAssignment {
        EntityAssignment::Team(slug.to_string())
    }

    #[tokio::test]
    async fn identity_key_is_unique() {
        let store = MemoryStore::new();
        let v = verdict(Label::Positive, 0.9);
        assert!(store
            .insert_record(&item("a"), &team("galatasaray"), &v)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .insert_record(&item("a"), &team("galatasaray"), &v)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.comment_count(), 1);
        assert_eq!(store.verdict_count(), 1);
    }

    #[tokio::test]
    async fn same_id_on_another_platform_is_distinct() {
        let store = MemoryStore::new();
        let v = verdict(Label::Neutral, 0.5);
        let mut other = item("a");
        other.platform = Platform::Youtube;
        store.insert_record(&item("a"), &team("besiktas"), &v).await.unwrap();
        assert!(store
            .insert_record(&other, &team("besiktas"), &v)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn tally_respects_team_and_window() {
        let store = MemoryStore::new();
        let day = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        store.insert_at(&item("1"), &team("fenerbahce"), &verdict(Label::Positive, 0.8), day);
        store.insert_at(&item("2"), &team("fenerbahce"), &verdict(Label::Negative, 0.4), day);
        store.insert_at(&item("3"), &team("besiktas"), &verdict(Label::Positive, 0.9), day);
        store.insert_at(
            &item("4"),
            &team("fenerbahce"),
            &verdict(Label::Positive, 0.9),
            day + chrono::Duration::days(1),
        );

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let tally = store
            .tally_window("fenerbahce", start, start + chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(tally.positive, 1);
        assert_eq!(tally.negative, 1);
        assert_eq!(tally.total(), 2);
        assert!((tally.signed_sum - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.duplicate_verdict_groups().await.is_err());
    }

    #[tokio::test]
    async fn list_records_filters_and_pages_newest_first() {
        let store = MemoryStore::new();
        let day = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        for (i, label) in [Label::Positive, Label::Negative, Label::Positive]
            .into_iter()
            .enumerate()
        {
            let at = day + chrono::Duration::hours(i64::try_from(i).unwrap());
            let id = format!("g{i}");
            store.insert_at(&item(&id), &team("galatasaray"), &verdict(label, 0.8), at);
        }
        store.insert_at(&item("b0"), &team("besiktas"), &verdict(Label::Positive, 0.8), day);

        let query = RecordQuery {
            team: Some("galatasaray".to_string()),
            label: Some(Label::Positive),
            limit: 1,
            ..RecordQuery::default()
        };
        let page = store.list_records(&query).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].item.source_id, "g2");

        let next = store
            .list_records(&RecordQuery { offset: 1, ..query })
            .await
            .unwrap();
        assert_eq!(next.records[0].item.source_id, "g0");

        let window = RecordQuery {
            author: Some("FAN".to_string()),
            from: Some(day + chrono::Duration::hours(1)),
            to: Some(day + chrono::Duration::hours(2)),
            limit: 10,
            ..RecordQuery::default()
        };
        let page = store.list_records(&window).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].item.source_id, "g1");
    }

    #[tokio::test]
    async fn overview_bands_confidence() {
        let store = MemoryStore::new();
        store.insert_record(&item("1"), &team("x"), &verdict(Label::Positive, 0.9)).await.unwrap();
        store.insert_record(&item("2"), &team("x"), &verdict(Label::Negative, 0.7)).await.unwrap();
        store.insert_record(&item("3"), &team("x"), &verdict(Label::Neutral, 0.3)).await.unwrap();

        let overview = store.sentiment_overview().await.unwrap();
        assert_eq!(overview.total, 3);
        assert_eq!(
            (overview.high_confidence, overview.medium_confidence, overview.low_confidence),
            (1, 1, 1)
        );
        assert!((overview.avg_signed_score - (0.9 - 0.7) / 3.0).abs() < 1e-9);
    }
}
