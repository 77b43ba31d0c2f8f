//! Retry with exponential back-off and jitter for backend HTTP calls.
//!
//! Only transport-level failures are retried. A backend that answers with a
//! well-formed but unusable body is a business failure and is returned as-is.

use std::future::Future;
use std::time::Duration;

use crate::error::SentimentError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 429 and 5xx.
///
/// **Not retriable:** other 4xx statuses, malformed responses, missing
/// configuration, invalid input.
pub(crate) fn is_retriable(err: &SentimentError) -> bool {
    match err {
        SentimentError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status()
                    .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
        }
        SentimentError::Status { status, .. } => *status == 429 || *status >= 500,
        SentimentError::Backend { .. }
        | SentimentError::NotConfigured(_)
        | SentimentError::Timeout { .. }
        | SentimentError::InvalidInput(_)
        | SentimentError::AnalysisUnavailable { .. }
        | SentimentError::Reddit(_) => false,
    }
}

/// Per-request timeout that lets every attempt fit inside `overall`.
///
/// `overall` is split evenly across the first try and `max_retries`
/// retries, with a floor of one second that never exceeds `overall`.
pub(crate) fn attempt_timeout(overall: Duration, max_retries: u32) -> Duration {
    const FLOOR: Duration = Duration::from_secs(1);
    let share = overall / max_retries.saturating_add(1);
    share.max(FLOOR).min(overall)
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Delay before retry `n` is `backoff_base_ms * 2^(n-1)` with ±25 % jitter,
/// capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    backend: &'static str,
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SentimentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SentimentError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    backend,
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient backend error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
