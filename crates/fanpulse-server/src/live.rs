//! Reddit collection: a cancellable polling task and one-shot collects.
//!
//! Each tick fetches the newest posts of every configured subreddit, keeps
//! the ones created in the last hour, and feeds them through the ingest
//! pipeline. A one-shot collect does the same once without the age cut-off.
//! Already-stored posts come back as duplicates and are counted, not
//! re-analysed.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use fanpulse_analytics::{BatchTally, IngestPipeline};
use fanpulse_core::{AppConfig, SourceItem, TeamConfig};
use fanpulse_sentiment::RedditClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    sync::{oneshot, Mutex},
    task::JoinHandle,
    time::MissedTickBehavior,
};

pub const MIN_INTERVAL_SECS: u64 = 10;
const LOOKBACK_HOURS: i64 = 1;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("live polling is already running")]
    AlreadyRunning,

    #[error("no subreddits to poll")]
    NoSubreddits,

    #[error("interval must be at least {MIN_INTERVAL_SECS}s, got {0}s")]
    IntervalTooShort(u64),
}

impl LiveError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            LiveError::AlreadyRunning => "conflict",
            LiveError::NoSubreddits | LiveError::IntervalTooShort(_) => "validation_error",
        }
    }
}

/// Optional overrides accepted by `POST /api/v1/live/start`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveStartRequest {
    pub subreddits: Option<Vec<String>>,
    pub interval_secs: Option<u64>,
    pub limit: Option<u32>,
}

/// Optional overrides accepted by `POST /api/v1/reddit/collect`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectRequest {
    pub subreddits: Option<Vec<String>>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectReport {
    pub subreddits: Vec<String>,
    pub collected: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub unattributed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConfig {
    pub subreddits: Vec<String>,
    pub interval: Duration,
    pub limit: u32,
}

/// Poller settings used when a start request leaves a field out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveDefaults {
    pub subreddits: Vec<String>,
    pub interval: Duration,
    pub limit: u32,
}

impl LiveDefaults {
    #[must_use]
    pub fn from_config(config: &AppConfig, teams: &[TeamConfig]) -> Self {
        Self::new(
            teams,
            Duration::from_secs(config.live_interval_secs),
            config.live_limit,
        )
    }

    /// Subreddits of every team in configured order, first occurrence kept.
    #[must_use]
    pub fn new(teams: &[TeamConfig], interval: Duration, limit: u32) -> Self {
        let mut subreddits: Vec<String> = Vec::new();
        for name in teams.iter().flat_map(|t| t.subreddits.iter()) {
            let name = normalize_subreddit(name);
            if !name.is_empty() && !subreddits.contains(&name) {
                subreddits.push(name);
            }
        }
        Self {
            subreddits,
            interval,
            limit,
        }
    }

    /// Merge `request` over these defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::NoSubreddits`] if the merged list is empty, or
    /// [`LiveError::IntervalTooShort`] below [`MIN_INTERVAL_SECS`].
    pub fn resolve(&self, request: LiveStartRequest) -> Result<LiveConfig, LiveError> {
        let subreddits = self.subreddits_or_default(request.subreddits)?;

        let interval = request
            .interval_secs
            .map_or(self.interval, Duration::from_secs);
        if interval.as_secs() < MIN_INTERVAL_SECS {
            return Err(LiveError::IntervalTooShort(interval.as_secs()));
        }

        Ok(LiveConfig {
            subreddits,
            interval,
            limit: request.limit.unwrap_or(self.limit),
        })
    }

    fn subreddits_or_default(&self, names: Option<Vec<String>>) -> Result<Vec<String>, LiveError> {
        let subreddits: Vec<String> = match names {
            Some(names) => names
                .iter()
                .map(|n| normalize_subreddit(n))
                .filter(|n| !n.is_empty())
                .collect(),
            None => self.subreddits.clone(),
        };
        if subreddits.is_empty() {
            return Err(LiveError::NoSubreddits);
        }
        Ok(subreddits)
    }
}

fn normalize_subreddit(name: &str) -> String {
    let name = name.trim().trim_start_matches('/');
    name.strip_prefix("r/").unwrap_or(name).trim().to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveStatus {
    pub running: bool,
    pub subreddits: Vec<String>,
    pub interval_secs: u64,
    pub limit: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub polls_completed: u64,
    pub items_inserted: usize,
    pub duplicates: usize,
    pub unattributed: usize,
    pub failed: usize,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl LiveStatus {
    fn record(&mut self, tally: BatchTally, error: Option<String>, at: DateTime<Utc>) {
        self.polls_completed += 1;
        self.items_inserted += tally.inserted;
        self.duplicates += tally.duplicates;
        self.unattributed += tally.unattributed;
        self.failed += tally.failed;
        self.last_poll_at = Some(at);
        self.last_error = error;
    }
}

struct RunningTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Start/stop/status handle for the polling task. Clones share one task.
#[derive(Clone)]
pub struct LivePoller {
    pipeline: Arc<IngestPipeline>,
    reddit: Arc<RedditClient>,
    defaults: Arc<LiveDefaults>,
    status: Arc<Mutex<LiveStatus>>,
    task: Arc<Mutex<Option<RunningTask>>>,
}

impl LivePoller {
    #[must_use]
    pub fn new(
        pipeline: Arc<IngestPipeline>,
        reddit: Arc<RedditClient>,
        defaults: LiveDefaults,
    ) -> Self {
        let status = LiveStatus {
            subreddits: defaults.subreddits.clone(),
            interval_secs: defaults.interval.as_secs(),
            limit: defaults.limit,
            ..LiveStatus::default()
        };
        Self {
            pipeline,
            reddit,
            defaults: Arc::new(defaults),
            status: Arc::new(Mutex::new(status)),
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the polling task. The first poll runs immediately.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::AlreadyRunning`] if a task is active, or a
    /// validation error from [`LiveDefaults::resolve`].
    pub async fn start(&self, request: LiveStartRequest) -> Result<LiveStatus, LiveError> {
        let config = self.defaults.resolve(request)?;

        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return Err(LiveError::AlreadyRunning);
        }

        let started = LiveStatus {
            running: true,
            subreddits: config.subreddits.clone(),
            interval_secs: config.interval.as_secs(),
            limit: config.limit,
            started_at: Some(Utc::now()),
            ..LiveStatus::default()
        };
        *self.status.lock().await = started.clone();

        tracing::info!(
            subreddits = ?config.subreddits,
            interval_secs = config.interval.as_secs(),
            limit = config.limit,
            "live polling started"
        );

        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(poll_loop(self.clone(), config, stop_rx));
        *task = Some(RunningTask { stop, handle });

        Ok(started)
    }

    /// Stop the polling task and wait for it to exit. No-op when idle.
    pub async fn stop(&self) -> LiveStatus {
        let running = self.task.lock().await.take();
        if let Some(running) = running {
            // receiver is gone if the task already exited
            let _ = running.stop.send(());
            if let Err(e) = running.handle.await {
                tracing::warn!(error = %e, "live polling task ended abnormally");
            }
            self.status.lock().await.running = false;
            tracing::info!("live polling stopped");
        }
        self.status().await
    }

    pub async fn status(&self) -> LiveStatus {
        self.status.lock().await.clone()
    }

    /// Fetch and ingest once, outside the polling task. The live status is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::NoSubreddits`] if there is nothing to collect.
    pub async fn collect_once(&self, request: CollectRequest) -> Result<CollectReport, LiveError> {
        let subreddits = self.defaults.subreddits_or_default(request.subreddits)?;
        let limit = request.limit.unwrap_or(self.defaults.limit);

        let (items, errors) = self
            .fetch_all(&subreddits, limit, DateTime::<Utc>::MIN_UTC)
            .await;
        let tally = self.pipeline.process_batch(&items).await;

        tracing::info!(
            subreddits = ?subreddits,
            collected = items.len(),
            inserted = tally.inserted,
            duplicates = tally.duplicates,
            errors = errors.len(),
            "reddit collection finished"
        );

        Ok(CollectReport {
            subreddits,
            collected: items.len(),
            inserted: tally.inserted,
            duplicates: tally.duplicates,
            unattributed: tally.unattributed,
            failed: tally.failed,
            errors,
        })
    }

    async fn fetch_all(
        &self,
        subreddits: &[String],
        limit: u32,
        since: DateTime<Utc>,
    ) -> (Vec<SourceItem>, Vec<String>) {
        let mut items: Vec<SourceItem> = Vec::new();
        let mut errors = Vec::new();

        for subreddit in subreddits {
            match self.reddit.fetch_new_posts(subreddit, limit, since).await {
                Ok(mut posts) => items.append(&mut posts),
                Err(e) => {
                    tracing::warn!(subreddit = %subreddit, error = %e, "reddit fetch failed");
                    errors.push(format!("r/{subreddit}: {e}"));
                }
            }
        }
        (items, errors)
    }

    /// One fetch-and-ingest pass over `config.subreddits`.
    async fn poll_once(&self, config: &LiveConfig) {
        let since = Utc::now() - chrono::Duration::hours(LOOKBACK_HOURS);
        let (items, mut errors) = self
            .fetch_all(&config.subreddits, config.limit, since)
            .await;
        let last_error = errors.pop();

        let tally = self.pipeline.process_batch(&items).await;
        if tally.inserted > 0 {
            tracing::info!(
                inserted = tally.inserted,
                duplicates = tally.duplicates,
                unattributed = tally.unattributed,
                "live poll stored new comments"
            );
        } else {
            tracing::debug!(fetched = items.len(), "live poll found nothing new");
        }

        self.status
            .lock()
            .await
            .record(tally, last_error, Utc::now());
    }
}

async fn poll_loop(poller: LivePoller, config: LiveConfig, mut stop: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            _ = &mut stop => break,
            () = poller.poll_once(&config) => {}
        }
    }
}
