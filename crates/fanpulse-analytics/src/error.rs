use fanpulse_core::SourceKey;
use fanpulse_sentiment::SentimentError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("item {0} has already been ingested")]
    DuplicateItem(SourceKey),

    #[error("text could not be attributed to any configured team")]
    Unattributed,

    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error("invalid date range: {0}")]
    InvalidRange(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sentiment(#[from] SentimentError),
}

impl AnalyticsError {
    /// Stable machine-readable code for API responses and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyticsError::DuplicateItem(_) => "duplicate_item",
            AnalyticsError::Unattributed | AnalyticsError::InvalidRange(_) => "validation_error",
            AnalyticsError::UnknownTeam(_) => "not_found",
            AnalyticsError::Store(_) => "store_unavailable",
            AnalyticsError::Sentiment(e) => e.kind(),
        }
    }
}
