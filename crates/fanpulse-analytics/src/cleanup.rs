//! Maintenance: prune duplicate verdict rows left by historical double-writes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AnalyticsError;
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupReport {
    pub groups_inspected: usize,
    pub duplicates_found: usize,
    pub records_removed: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Keep the lowest verdict id per comment and delete the rest.
///
/// A failed delete for one group is recorded in [`CleanupReport::errors`] and
/// the remaining groups are still processed.
///
/// # Errors
///
/// Returns [`AnalyticsError::Store`] if the duplicate groups cannot be listed.
pub async fn cleanup_duplicate_verdicts(
    store: &dyn RecordStore,
) -> Result<CleanupReport, AnalyticsError> {
    let groups = store.duplicate_verdict_groups().await?;

    let mut duplicates_found = 0;
    let mut records_removed = 0;
    let mut errors = Vec::new();

    for group in &groups {
        let mut ids = group.verdict_ids.clone();
        ids.sort_unstable();
        let Some((keep, extra)) = ids.split_first() else {
            continue;
        };
        if extra.is_empty() {
            continue;
        }
        duplicates_found += extra.len();

        match store.delete_verdicts(extra).await {
            Ok(removed) => {
                tracing::debug!(
                    comment_id = group.comment_id,
                    kept = *keep,
                    removed,
                    "removed duplicate verdicts"
                );
                records_removed += removed;
            }
            Err(e) => {
                tracing::warn!(
                    comment_id = group.comment_id,
                    error = %e,
                    "duplicate verdict delete failed"
                );
                errors.push(format!("comment {}: {e}", group.comment_id));
            }
        }
    }

    let report = CleanupReport {
        groups_inspected: groups.len(),
        duplicates_found,
        records_removed,
        errors,
        completed_at: Utc::now(),
    };

    tracing::info!(
        groups = report.groups_inspected,
        duplicates = report.duplicates_found,
        removed = report.records_removed,
        errors = report.errors.len(),
        "duplicate verdict cleanup finished"
    );

    Ok(report)
}
