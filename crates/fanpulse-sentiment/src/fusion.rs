//! Two-backend sentiment fusion.
//!
//! | A      | B      | Result                                              |
//! |--------|--------|-----------------------------------------------------|
//! | fail   | fail   | `AnalysisUnavailable`                               |
//! | ok     | fail   | A, `a-only`                                         |
//! | fail   | ok     | B, `b-only`                                         |
//! | ok = L | ok = L | L, mean score, `min(0.95, mean conf + 0.1)`, `hybrid-consensus` |
//! | ok     | ok ≠   | higher confidence wins (tie to A), `hybrid-{a,b}-primary` |

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fanpulse_core::{AppConfig, Provenance, Verdict};

use crate::backends::{BackendVerdict, Classifier, GroqClassifier, HuggingFaceClassifier};
use crate::preprocess;
use crate::SentimentError;

const CONSENSUS_BONUS: f64 = 0.1;
const CONSENSUS_CAP: f64 = 0.95;

#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub backend_timeout: Duration,
    pub max_chars: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(30),
            max_chars: 1600,
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            backend_timeout: Duration::from_secs(config.backend_timeout_secs),
            max_chars: config.max_text_chars,
        }
    }
}

pub struct SentimentResolver {
    backend_a: Option<Arc<dyn Classifier>>,
    backend_b: Option<Arc<dyn Classifier>>,
    config: ResolverConfig,
}

impl SentimentResolver {
    #[must_use]
    pub fn new(
        backend_a: Option<Arc<dyn Classifier>>,
        backend_b: Option<Arc<dyn Classifier>>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            backend_a,
            backend_b,
            config,
        }
    }

    /// Build both HTTP backends from app config. A backend without a
    /// credential is left unconfigured and always abstains.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, SentimentError> {
        let backend_a = HuggingFaceClassifier::from_config(config)?
            .map(|c| Arc::new(c) as Arc<dyn Classifier>);
        let backend_b =
            GroqClassifier::from_config(config)?.map(|c| Arc::new(c) as Arc<dyn Classifier>);

        if backend_a.is_none() && backend_b.is_none() {
            tracing::warn!(
                "no sentiment backend configured; set HUGGINGFACE_TOKEN or GROQ_API_KEY"
            );
        }

        Ok(Self::new(
            backend_a,
            backend_b,
            ResolverConfig::from_app_config(config),
        ))
    }

    /// Names of the configured backends, in A/B order.
    #[must_use]
    pub fn backend_names(&self) -> (Option<&'static str>, Option<&'static str>) {
        (
            self.backend_a.as_ref().map(|b| b.name()),
            self.backend_b.as_ref().map(|b| b.name()),
        )
    }

    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.config.max_chars
    }

    /// Resolve the sentiment of `text` using both backends concurrently.
    ///
    /// # Errors
    ///
    /// - [`SentimentError::InvalidInput`] if `text` is empty after cleaning;
    ///   no backend is called in that case.
    /// - [`SentimentError::AnalysisUnavailable`] if both backends fail, time
    ///   out, or are unconfigured.
    pub async fn resolve(&self, text: &str) -> Result<Verdict, SentimentError> {
        let prepared = preprocess::prepare(text, self.config.max_chars)?;

        let (a, b) = tokio::join!(
            self.run_backend("backend-a", self.backend_a.as_deref(), &prepared),
            self.run_backend("backend-b", self.backend_b.as_deref(), &prepared),
        );

        fuse(a, b, Utc::now())
    }

    async fn run_backend(
        &self,
        slot: &'static str,
        backend: Option<&dyn Classifier>,
        text: &str,
    ) -> Result<BackendVerdict, SentimentError> {
        let Some(backend) = backend else {
            return Err(SentimentError::NotConfigured(slot));
        };

        let timeout = self.config.backend_timeout;
        let result = tokio::time::timeout(timeout, backend.classify(text, self.config.max_chars))
            .await
            .unwrap_or_else(|_| {
                Err(SentimentError::Timeout {
                    backend: backend.name(),
                    secs: timeout.as_secs(),
                })
            });

        if let Err(e) = &result {
            tracing::warn!(
                slot,
                backend = backend.name(),
                kind = e.kind(),
                error = %e,
                "sentiment backend unavailable"
            );
        }
        result
    }
}

/// Combine two backend outcomes into one verdict.
///
/// # Errors
///
/// Returns [`SentimentError::AnalysisUnavailable`] when both outcomes are errors.
pub fn fuse(
    a: Result<BackendVerdict, SentimentError>,
    b: Result<BackendVerdict, SentimentError>,
    produced_at: DateTime<Utc>,
) -> Result<Verdict, SentimentError> {
    let verdict = |v: BackendVerdict, provenance| {
        Verdict::new(v.label, v.score, v.confidence, provenance, produced_at)
    };

    match (a, b) {
        (Err(ea), Err(eb)) => Err(SentimentError::AnalysisUnavailable {
            a: ea.to_string(),
            b: eb.to_string(),
        }),
        (Ok(va), Err(_)) => Ok(verdict(va, Provenance::AOnly)),
        (Err(_), Ok(vb)) => Ok(verdict(vb, Provenance::BOnly)),
        (Ok(va), Ok(vb)) if va.label == vb.label => {
            let score = (va.score + vb.score) / 2.0;
            let confidence =
                ((va.confidence + vb.confidence) / 2.0 + CONSENSUS_BONUS).min(CONSENSUS_CAP);
            Ok(Verdict::new(
                va.label,
                score,
                confidence,
                Provenance::HybridConsensus,
                produced_at,
            ))
        }
        (Ok(va), Ok(vb)) => {
            if vb.confidence > va.confidence {
                Ok(verdict(vb, Provenance::HybridBPrimary))
            } else {
                Ok(verdict(va, Provenance::HybridAPrimary))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use fanpulse_core::Label;

    use super::*;

    fn bv(label: Label, conf: f64) -> BackendVerdict {
        BackendVerdict {
            label,
            score: conf,
            confidence: conf,
        }
    }

    fn down() -> SentimentError {
        SentimentError::NotConfigured("test")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn consensus_averages_and_boosts_confidence() {
        let v = fuse(
            Ok(bv(Label::Positive, 0.6)),
            Ok(bv(Label::Positive, 0.8)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(v.label, Label::Positive);
        assert!(close(v.confidence, 0.8), "got {}", v.confidence);
        assert!(close(v.score, 0.7));
        assert_eq!(v.model_used, Provenance::HybridConsensus);
    }

    #[test]
    fn consensus_confidence_is_capped() {
        let v = fuse(
            Ok(bv(Label::Negative, 0.99)),
            Ok(bv(Label::Negative, 0.97)),
            Utc::now(),
        )
        .unwrap();
        assert!(close(v.confidence, 0.95));
    }

    #[test]
    fn disagreement_picks_higher_confidence_a() {
        let v = fuse(
            Ok(bv(Label::Positive, 0.9)),
            Ok(bv(Label::Negative, 0.4)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(v.label, Label::Positive);
        assert!(close(v.confidence, 0.9));
        assert_eq!(v.model_used, Provenance::HybridAPrimary);
    }

    #[test]
    fn disagreement_picks_higher_confidence_b() {
        let v = fuse(
            Ok(bv(Label::Neutral, 0.5)),
            Ok(bv(Label::Negative, 0.7)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(v.label, Label::Negative);
        assert_eq!(v.model_used, Provenance::HybridBPrimary);
    }

    #[test]
    fn disagreement_tie_goes_to_a() {
        let v = fuse(
            Ok(bv(Label::Positive, 0.7)),
            Ok(bv(Label::Negative, 0.7)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(v.label, Label::Positive);
        assert_eq!(v.model_used, Provenance::HybridAPrimary);
    }

    #[test]
    fn single_backend_results_pass_through() {
        let a = fuse(Ok(bv(Label::Negative, 0.66)), Err(down()), Utc::now()).unwrap();
        assert_eq!(a.model_used, Provenance::AOnly);
        assert!(close(a.confidence, 0.66));

        let b = fuse(Err(down()), Ok(bv(Label::Positive, 0.55)), Utc::now()).unwrap();
        assert_eq!(b.model_used, Provenance::BOnly);
        assert_eq!(b.label, Label::Positive);
    }

    #[test]
    fn both_failing_is_analysis_unavailable() {
        let err = fuse(Err(down()), Err(down()), Utc::now()).unwrap_err();
        assert!(matches!(err, SentimentError::AnalysisUnavailable { .. }));
    }

    #[test]
    fn out_of_range_backend_values_are_clamped() {
        let v = fuse(
            Ok(BackendVerdict {
                label: Label::Positive,
                score: 1.4,
                confidence: 3.0,
            }),
            Err(down()),
            Utc::now(),
        )
        .unwrap();
        assert!(close(v.score, 1.0));
        assert!(close(v.confidence, 1.0));
    }

    // -----------------------------------------------------------------------
    // Resolver with fake backends
    // -----------------------------------------------------------------------

    struct Fixed {
        name: &'static str,
        verdict: Option<BackendVerdict>,
        delay: Duration,
        calls: AtomicU32,
    }

    impl Fixed {
        fn ok(name: &'static str, label: Label, conf: f64) -> Arc<Self> {
            Arc::new(Self {
                name,
                verdict: Some(bv(label, conf)),
                delay: Duration::ZERO,
                calls: AtomicU32::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                verdict: None,
                delay: Duration::ZERO,
                calls: AtomicU32::new(0),
            })
        }

        fn slow(name: &'static str, label: Label, conf: f64, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                verdict: Some(bv(label, conf)),
                delay,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Classifier for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn classify(
            &self,
            _text: &str,
            _max: usize,
        ) -> Result<BackendVerdict, SentimentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.verdict.ok_or(SentimentError::Backend {
                backend: self.name,
                message: "boom".into(),
            })
        }
    }

    fn resolver(
        a: Option<Arc<Fixed>>,
        b: Option<Arc<Fixed>>,
        timeout: Duration,
    ) -> SentimentResolver {
        SentimentResolver::new(
            a.map(|x| x as Arc<dyn Classifier>),
            b.map(|x| x as Arc<dyn Classifier>),
            ResolverConfig {
                backend_timeout: timeout,
                max_chars: 1600,
            },
        )
    }

    #[tokio::test]
    async fn resolve_uses_both_backends() {
        let a = Fixed::ok("a", Label::Positive, 0.6);
        let b = Fixed::ok("b", Label::Positive, 0.8);
        let r = resolver(Some(a.clone()), Some(b.clone()), Duration::from_secs(5));
        let v = r.resolve("Harika bir maçtı").await.unwrap();
        assert_eq!(v.model_used, Provenance::HybridConsensus);
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_rejects_empty_text_without_calling_backends() {
        let a = Fixed::ok("a", Label::Positive, 0.6);
        let r = resolver(Some(a.clone()), None, Duration::from_secs(5));
        let err = r.resolve(" \n ").await.unwrap_err();
        assert!(matches!(err, SentimentError::InvalidInput(_)));
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unconfigured_backend_degrades_to_single() {
        let b = Fixed::ok("b", Label::Negative, 0.7);
        let r = resolver(None, Some(b), Duration::from_secs(5));
        let v = r.resolve("Hakem rezaletti").await.unwrap();
        assert_eq!(v.model_used, Provenance::BOnly);
        assert_eq!(r.backend_names(), (None, Some("b")));
    }

    #[tokio::test]
    async fn failing_backend_degrades_to_single() {
        let r = resolver(
            Some(Fixed::ok("a", Label::Neutral, 0.5)),
            Some(Fixed::failing("b")),
            Duration::from_secs(5),
        );
        let v = r.resolve("maç berabere").await.unwrap();
        assert_eq!(v.model_used, Provenance::AOnly);
    }

    #[tokio::test]
    async fn timed_out_backend_counts_as_failure() {
        let r = resolver(
            Some(Fixed::slow("a", Label::Positive, 0.9, Duration::from_secs(10))),
            Some(Fixed::ok("b", Label::Negative, 0.4)),
            Duration::from_millis(50),
        );
        let v = r.resolve("uzun süren analiz").await.unwrap();
        assert_eq!(v.model_used, Provenance::BOnly);
        assert_eq!(v.label, Label::Negative);
    }

    #[tokio::test]
    async fn no_backends_is_analysis_unavailable() {
        let r = resolver(None, None, Duration::from_secs(1));
        let err = r.resolve("text").await.unwrap_err();
        assert_eq!(err.kind(), "analysis_unavailable");
    }
}
