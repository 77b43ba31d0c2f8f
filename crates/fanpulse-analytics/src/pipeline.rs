//! Candidate item -> attribution -> verdict -> idempotent write.

use std::sync::Arc;

use fanpulse_core::{EntityAssignment, SourceItem, StoredRecord};
use fanpulse_sentiment::{EntityAttributor, SentimentResolver};
use serde::Serialize;

use crate::error::AnalyticsError;
use crate::ingest::IngestionGate;

/// Outcome counts for one [`IngestPipeline::process_batch`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchTally {
    pub inserted: usize,
    pub duplicates: usize,
    pub unattributed: usize,
    pub failed: usize,
}

pub struct IngestPipeline {
    attributor: Arc<EntityAttributor>,
    resolver: Arc<SentimentResolver>,
    gate: IngestionGate,
    store_unassigned: bool,
}

impl IngestPipeline {
    #[must_use]
    pub fn new(
        attributor: Arc<EntityAttributor>,
        resolver: Arc<SentimentResolver>,
        gate: IngestionGate,
        store_unassigned: bool,
    ) -> Self {
        Self {
            attributor,
            resolver,
            gate,
            store_unassigned,
        }
    }

    #[must_use]
    pub fn attributor(&self) -> &Arc<EntityAttributor> {
        &self.attributor
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<SentimentResolver> {
        &self.resolver
    }

    #[must_use]
    pub fn gate(&self) -> &IngestionGate {
        &self.gate
    }

    /// Attribute, resolve and store one item.
    ///
    /// `team` overrides keyword attribution when the caller already knows the
    /// team. Items already stored are rejected before any backend is called.
    ///
    /// # Errors
    ///
    /// - [`AnalyticsError::DuplicateItem`] if the identity key is taken.
    /// - [`AnalyticsError::UnknownTeam`] if `team` is not a configured slug.
    /// - [`AnalyticsError::Unattributed`] if no team matched and unassigned
    ///   items are not stored.
    /// - [`AnalyticsError::Sentiment`] if the text is empty or both backends
    ///   are unavailable.
    /// - [`AnalyticsError::Store`] if the store fails.
    pub async fn process(
        &self,
        item: &SourceItem,
        team: Option<&str>,
    ) -> Result<StoredRecord, AnalyticsError> {
        let key = item.key();
        if self.gate.exists(&key).await? {
            tracing::debug!(
                source_id = %key.source_id,
                platform = %key.platform,
                "skipping stored item"
            );
            return Err(AnalyticsError::DuplicateItem(key));
        }

        let assignment = match team {
            Some(slug) if self.attributor.contains_team(slug) => {
                EntityAssignment::Team(slug.to_string())
            }
            Some(slug) => return Err(AnalyticsError::UnknownTeam(slug.to_string())),
            None => self.attributor.attribute(&item.text),
        };

        if assignment == EntityAssignment::Unassigned && !self.store_unassigned {
            return Err(AnalyticsError::Unattributed);
        }

        let verdict = self.resolver.resolve(&item.text).await?;
        self.gate.ingest(item, &assignment, &verdict).await
    }

    /// Run [`Self::process`] over `items` in order, continuing past failures.
    pub async fn process_batch(&self, items: &[SourceItem]) -> BatchTally {
        let mut tally = BatchTally::default();
        for item in items {
            match self.process(item, None).await {
                Ok(_) => tally.inserted += 1,
                Err(AnalyticsError::DuplicateItem(_)) => tally.duplicates += 1,
                Err(AnalyticsError::Unattributed) => tally.unattributed += 1,
                Err(e) => {
                    tracing::warn!(
                        source_id = %item.source_id,
                        platform = %item.platform,
                        kind = e.kind(),
                        error = %e,
                        "item processing failed"
                    );
                    tally.failed += 1;
                }
            }
        }
        tally
    }
}
