//! Fakes shared by the server's router and poller tests.

use std::sync::Arc;

use async_trait::async_trait;
use fanpulse_analytics::{IngestPipeline, IngestionGate, MemoryStore, RecordStore};
use fanpulse_core::{Label, TeamConfig, TeamsFile};
use fanpulse_sentiment::{
    BackendVerdict, Classifier, EntityAttributor, ResolverConfig, SentimentError,
    SentimentResolver,
};

pub(crate) struct FixedClassifier(pub Option<(Label, f64)>);

#[async_trait]
impl Classifier for FixedClassifier {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn classify(
        &self,
        _text: &str,
        _max_chars: usize,
    ) -> Result<BackendVerdict, SentimentError> {
        match self.0 {
            Some((label, confidence)) => Ok(BackendVerdict {
                label,
                score: confidence,
                confidence,
            }),
            None => Err(SentimentError::Backend {
                backend: "fixed",
                message: "down".to_string(),
            }),
        }
    }
}

pub(crate) fn teams() -> TeamsFile {
    let team = |name: &str, slug: &str, keywords: &[&str], subreddit: &str| TeamConfig {
        name: name.to_string(),
        slug: slug.to_string(),
        league: Some("Süper Lig".to_string()),
        country: Some("TR".to_string()),
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        subreddits: vec![subreddit.to_string()],
    };
    TeamsFile {
        teams: vec![
            team("Galatasaray", "galatasaray", &["galatasaray", "cimbom"], "galatasaray"),
            team("Fenerbahçe", "fenerbahce", &["fenerbahçe", "kanarya"], "fenerbahce"),
        ],
    }
}

pub(crate) fn pipeline(
    store: Arc<MemoryStore>,
    a: Option<(Label, f64)>,
    b: Option<(Label, f64)>,
) -> IngestPipeline {
    let resolver = SentimentResolver::new(
        Some(Arc::new(FixedClassifier(a)) as Arc<dyn Classifier>),
        Some(Arc::new(FixedClassifier(b)) as Arc<dyn Classifier>),
        ResolverConfig::default(),
    );
    IngestPipeline::new(
        Arc::new(EntityAttributor::new(&teams().teams)),
        Arc::new(resolver),
        IngestionGate::new(store as Arc<dyn RecordStore>),
        false,
    )
}
