use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} returned HTTP {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("{backend} response error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{backend} timed out after {secs}s")]
    Timeout { backend: &'static str, secs: u64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("analysis unavailable (backend-a: {a}; backend-b: {b})")]
    AnalysisUnavailable { a: String, b: String },

    #[error("Reddit API error: {0}")]
    Reddit(String),
}

impl SentimentError {
    /// Stable machine-readable code for API responses and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SentimentError::Http(_)
            | SentimentError::Status { .. }
            | SentimentError::Backend { .. }
            | SentimentError::NotConfigured(_)
            | SentimentError::Timeout { .. }
            | SentimentError::Reddit(_) => "backend_unavailable",
            SentimentError::InvalidInput(_) => "validation_error",
            SentimentError::AnalysisUnavailable { .. } => "analysis_unavailable",
        }
    }
}
