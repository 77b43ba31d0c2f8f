//! Groq-hosted LLM sentiment classifier (backend B).
//!
//! Uses the OpenAI-compatible chat completions endpoint and asks for a JSON
//! object with `sentiment` and `confidence`. Replies that do not contain a
//! parseable object count as a failed call.

use std::time::Duration;

use async_trait::async_trait;
use fanpulse_core::AppConfig;
use serde::{Deserialize, Serialize};

use super::{ensure_success, BackendVerdict, Classifier};
use crate::labels::normalize_label;
use crate::preprocess::truncate_at_word;
use crate::retry::{attempt_timeout, retry_with_backoff};
use crate::SentimentError;

const BACKEND: &str = "groq";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct SentimentReply {
    sentiment: String,
    confidence: f64,
}

pub struct GroqClassifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl GroqClassifier {
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, SentimentError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Build from app config. Returns `Ok(None)` when no API key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, SentimentError> {
        let Some(api_key) = config.groq_api_key.as_deref() else {
            return Ok(None);
        };
        Self::new(
            &config.groq_base_url,
            api_key,
            &config.groq_model,
            attempt_timeout(
                Duration::from_secs(config.backend_timeout_secs),
                config.backend_max_retries,
            ),
            config.backend_max_retries,
            config.backend_retry_backoff_ms,
        )
        .map(Some)
    }

    async fn complete(&self, prompt: &str) -> Result<String, SentimentError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.1,
            max_tokens: 200,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(BACKEND, response).await?;

        let body: ChatResponse = response.json().await.map_err(|e| SentimentError::Backend {
            backend: BACKEND,
            message: format!("response parse error: {e}"),
        })?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SentimentError::Backend {
                backend: BACKEND,
                message: "empty choices".to_string(),
            })
    }
}

#[async_trait]
impl Classifier for GroqClassifier {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn classify(
        &self,
        text: &str,
        max_chars: usize,
    ) -> Result<BackendVerdict, SentimentError> {
        let prompt = build_prompt(&truncate_at_word(text, max_chars));
        let reply = retry_with_backoff(BACKEND, self.max_retries, self.backoff_base_ms, || {
            self.complete(&prompt)
        })
        .await?;

        let parsed = parse_reply(&reply)?;
        Ok(BackendVerdict {
            label: normalize_label(&parsed.sentiment),
            score: parsed.confidence,
            confidence: parsed.confidence,
        })
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        r#"You are a football analyst who reads Turkish and English fan comments.
Classify the sentiment of the following fan comment.

COMMENT: "{text}"

Respond with ONLY a JSON object in this exact format:
{{"sentiment": "POSITIVE" | "NEGATIVE" | "NEUTRAL", "confidence": <number between 0.0 and 1.0>}}"#
    )
}

/// Extract and parse the first `{ ... }` span of an LLM reply.
fn parse_reply(reply: &str) -> Result<SentimentReply, SentimentError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &reply[s..=e],
        _ => {
            return Err(SentimentError::Backend {
                backend: BACKEND,
                message: "reply contains no JSON object".to_string(),
            })
        }
    };

    serde_json::from_str(json).map_err(|e| SentimentError::Backend {
        backend: BACKEND,
        message: format!("unparseable reply: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reply_extracts_embedded_object() {
        let reply = "Sure! Here you go:\n```json\n\
                     {\"sentiment\": \"NEGATIVE\", \"confidence\": 0.82}\n```";
        let parsed = parse_reply(reply).unwrap();
        assert_eq!(parsed.sentiment, "NEGATIVE");
        assert!((parsed.confidence - 0.82).abs() < 1e-9);
    }

    #[test]
    fn parse_reply_ignores_extra_fields() {
        let reply = r#"{"sentiment":"POSITIVE","confidence":0.9,"category":"TRANSFER"}"#;
        assert!(parse_reply(reply).is_ok());
    }

    #[test]
    fn parse_reply_without_object_fails() {
        let err = parse_reply("I think it is positive").unwrap_err();
        assert!(matches!(err, SentimentError::Backend { .. }));
    }

    #[test]
    fn parse_reply_missing_confidence_fails() {
        assert!(parse_reply(r#"{"sentiment":"POSITIVE"}"#).is_err());
    }

    #[test]
    fn prompt_embeds_comment() {
        let prompt = build_prompt("Fener bugün harikaydı");
        assert!(prompt.contains("COMMENT: \"Fener bugün harikaydı\""));
        assert!(prompt.contains("\"confidence\""));
    }
}
