//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the daily
//! duplicate-verdict cleanup.

use std::sync::Arc;

use fanpulse_analytics::{cleanup_duplicate_verdicts, RecordStore};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every day at 03:30 UTC.
const CLEANUP_SCHEDULE: &str = "0 30 3 * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    store: Arc<dyn RecordStore>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    scheduler.add(cleanup_job(store)?).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

fn cleanup_job(store: Arc<dyn RecordStore>) -> Result<Job, JobSchedulerError> {
    Job::new_async(CLEANUP_SCHEDULE, move |_uuid, _lock| {
        let store = Arc::clone(&store);

        Box::pin(async move {
            tracing::info!("scheduler: starting duplicate-verdict cleanup");
            run_cleanup(store.as_ref()).await;
        })
    })
}

async fn run_cleanup(store: &dyn RecordStore) {
    match cleanup_duplicate_verdicts(store).await {
        Ok(report) => tracing::info!(
            removed = report.records_removed,
            groups = report.groups_inspected,
            errors = report.errors.len(),
            "scheduler: duplicate-verdict cleanup complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: duplicate-verdict cleanup failed"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fanpulse_analytics::MemoryStore;
    use fanpulse_core::{EntityAssignment, Label, Platform, Provenance, SourceItem, Verdict};

    use super::*;

    #[test]
    fn cleanup_schedule_parses() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        assert!(cleanup_job(store).is_ok());
    }

    #[tokio::test]
    async fn run_cleanup_prunes_extra_verdicts() {
        let store = Arc::new(MemoryStore::new());
        let verdict = Verdict::new(Label::Positive, 0.8, 0.8, Provenance::AOnly, Utc::now());
        let item = SourceItem {
            source_id: "abc".to_string(),
            platform: Platform::Reddit,
            text: "Cimbom".to_string(),
            author: "fan".to_string(),
            observed_at: Utc::now(),
        };
        let record = store
            .insert_at(
                &item,
                &EntityAssignment::Team("galatasaray".to_string()),
                &verdict,
                Utc::now(),
            )
            .expect("inserted");
        store.push_extra_verdict(record.comment_id, &verdict);
        assert_eq!(store.verdict_count(), 2);

        run_cleanup(store.as_ref()).await;
        assert_eq!(store.verdict_count(), 1);
    }
}
