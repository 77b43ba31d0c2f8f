//! Ingestion and trend analytics for FanPulse.
//!
//! Everything here talks to persistence through the [`RecordStore`] seam:
//! the ingest pipeline writes attributed verdicts exactly once per source
//! item, the cleanup job prunes historical duplicate verdicts, and the trend
//! bucketer and insight ranker read per-day tallies back out.

pub mod cleanup;
pub mod error;
pub mod ingest;
pub mod insights;
pub mod memory;
pub mod pipeline;
pub mod store;
pub mod trends;

pub use cleanup::{cleanup_duplicate_verdicts, CleanupReport};
pub use error::AnalyticsError;
pub use ingest::IngestionGate;
pub use insights::{rank_insights, Insight, InsightKind, Severity};
pub use memory::MemoryStore;
pub use pipeline::{BatchTally, IngestPipeline};
pub use store::{
    DayTally, DuplicateGroup, PgRecordStore, RecordPage, RecordQuery, RecordStore,
    SentimentOverview, StoreError,
};
pub use trends::{
    analyze_period, compute_overall, DayBucket, Period, TeamOverall, TeamTrend, TrendAnalysis,
    TrendBucketer, TrendDirection, TrendSummary,
};
