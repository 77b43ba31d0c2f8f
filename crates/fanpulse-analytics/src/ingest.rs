//! Idempotent write path for attributed verdicts.

use std::sync::Arc;

use fanpulse_core::{EntityAssignment, SourceItem, SourceKey, StoredRecord, Verdict};

use crate::error::AnalyticsError;
use crate::store::RecordStore;

/// Writes each source item at most once, keyed by `(source_id, platform)`.
#[derive(Clone)]
pub struct IngestionGate {
    store: Arc<dyn RecordStore>,
}

impl IngestionGate {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Whether a record with this identity key is already stored.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Store`] if the lookup fails.
    pub async fn exists(&self, key: &SourceKey) -> Result<bool, AnalyticsError> {
        Ok(self.store.find_record(key).await?.is_some())
    }

    /// Persist `item` with its attribution and verdict.
    ///
    /// # Errors
    ///
    /// - [`AnalyticsError::DuplicateItem`] if the identity key is taken, either
    ///   on the pre-check or as a conflict on the conditional insert.
    /// - [`AnalyticsError::Store`] if the store fails or times out.
    pub async fn ingest(
        &self,
        item: &SourceItem,
        assignment: &EntityAssignment,
        verdict: &Verdict,
    ) -> Result<StoredRecord, AnalyticsError> {
        let key = item.key();
        if self.exists(&key).await? {
            tracing::debug!(
                source_id = %key.source_id,
                platform = %key.platform,
                "item already ingested"
            );
            return Err(AnalyticsError::DuplicateItem(key));
        }

        match self.store.insert_record(item, assignment, verdict).await? {
            Some(record) => {
                tracing::debug!(
                    source_id = %key.source_id,
                    platform = %key.platform,
                    team = assignment.team_slug().unwrap_or("-"),
                    label = %record.verdict.label,
                    "item ingested"
                );
                Ok(record)
            }
            None => {
                tracing::debug!(
                    source_id = %key.source_id,
                    platform = %key.platform,
                    "identity key conflict on insert"
                );
                Err(AnalyticsError::DuplicateItem(key))
            }
        }
    }
}
