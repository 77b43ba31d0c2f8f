//! HuggingFace inference API text classifier (backend A).

use std::time::Duration;

use async_trait::async_trait;
use fanpulse_core::AppConfig;
use serde::{Deserialize, Serialize};

use super::{ensure_success, BackendVerdict, Classifier};
use crate::labels::normalize_label;
use crate::preprocess::truncate_at_word;
use crate::retry::{attempt_timeout, retry_with_backoff};
use crate::SentimentError;

const BACKEND: &str = "huggingface";

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: [&'a str; 1],
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// The inference API nests results per input; some models return a flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error { error: String },
}

pub struct HuggingFaceClassifier {
    client: reqwest::Client,
    model_url: String,
    token: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HuggingFaceClassifier {
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built.
    pub fn new(
        model_url: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, SentimentError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            model_url: model_url.into(),
            token: token.into(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Build from app config. Returns `Ok(None)` when no token is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, SentimentError> {
        let Some(token) = config.huggingface_token.as_deref() else {
            return Ok(None);
        };
        Self::new(
            &config.huggingface_model_url,
            token,
            attempt_timeout(
                Duration::from_secs(config.backend_timeout_secs),
                config.backend_max_retries,
            ),
            config.backend_max_retries,
            config.backend_retry_backoff_ms,
        )
        .map(Some)
    }

    async fn request(&self, text: &str) -> Result<InferenceResponse, SentimentError> {
        let response = self
            .client
            .post(&self.model_url)
            .bearer_auth(&self.token)
            .json(&InferenceRequest { inputs: [text] })
            .send()
            .await?;
        let response = ensure_success(BACKEND, response).await?;
        response
            .json::<InferenceResponse>()
            .await
            .map_err(|e| SentimentError::Backend {
                backend: BACKEND,
                message: format!("response parse error: {e}"),
            })
    }
}

#[async_trait]
impl Classifier for HuggingFaceClassifier {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn classify(
        &self,
        text: &str,
        max_chars: usize,
    ) -> Result<BackendVerdict, SentimentError> {
        let text = truncate_at_word(text, max_chars);
        let response = retry_with_backoff(BACKEND, self.max_retries, self.backoff_base_ms, || {
            self.request(&text)
        })
        .await?;

        let candidates = match response {
            InferenceResponse::Nested(mut outer) => {
                if outer.is_empty() {
                    Vec::new()
                } else {
                    outer.swap_remove(0)
                }
            }
            InferenceResponse::Flat(flat) => flat,
            InferenceResponse::Error { error } => {
                return Err(SentimentError::Backend {
                    backend: BACKEND,
                    message: error,
                })
            }
        };

        let best = best_result(&candidates).ok_or_else(|| SentimentError::Backend {
            backend: BACKEND,
            message: "empty classification result".to_string(),
        })?;

        tracing::debug!(label = %best.label, score = best.score, "huggingface classification");

        Ok(BackendVerdict {
            label: normalize_label(&best.label),
            score: best.score,
            confidence: best.score,
        })
    }
}

fn best_result(candidates: &[LabelScore]) -> Option<&LabelScore> {
    candidates
        .iter()
        .filter(|c| c.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score))
}
