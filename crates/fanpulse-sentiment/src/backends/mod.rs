//! Sentiment classifier backends.
//!
//! Both backends speak HTTP and return a [`BackendVerdict`]. Any error they
//! produce is an abstention from the resolver's point of view.

mod groq;
mod huggingface;

pub use groq::GroqClassifier;
pub use huggingface::HuggingFaceClassifier;

use async_trait::async_trait;
use fanpulse_core::Label;

use crate::SentimentError;

/// Raw output of a single backend, before fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendVerdict {
    pub label: Label,
    pub score: f64,
    pub confidence: f64,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Classify `text`, which is at most `max_chars` characters long.
    async fn classify(&self, text: &str, max_chars: usize)
        -> Result<BackendVerdict, SentimentError>;
}

/// Turn a non-2xx response into [`SentimentError::Status`] with a body snippet.
async fn ensure_success(
    backend: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, SentimentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SentimentError::Status {
        backend,
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}
