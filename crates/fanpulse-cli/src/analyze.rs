//! Single-text commands: `analyze` and `ingest`.

use std::sync::Arc;

use chrono::Utc;
use fanpulse_analytics::{IngestPipeline, IngestionGate, RecordStore};
use fanpulse_core::{AppConfig, Platform, SourceItem, Verdict};
use fanpulse_sentiment::{EntityAttributor, SentimentResolver};

pub(crate) struct IngestInput {
    pub source_id: String,
    pub platform: String,
    pub team: Option<String>,
    pub author: Option<String>,
    pub text: String,
}

fn load_attributor(config: &AppConfig) -> anyhow::Result<EntityAttributor> {
    let teams = fanpulse_core::load_teams(&config.teams_path)?;
    Ok(EntityAttributor::new(&teams.teams))
}

fn print_verdict(verdict: &Verdict, team: Option<&str>) {
    println!("label:      {}", verdict.label);
    println!("score:      {:.3}", verdict.score);
    println!("signed:     {:+.3}", verdict.signed_score());
    println!("confidence: {:.3}", verdict.confidence);
    println!("model:      {}", verdict.model_used);
    println!("team:       {}", team.unwrap_or("unassigned"));
}

/// Resolve `text` and print the verdict and the team it would be attributed to.
///
/// # Errors
///
/// Returns an error if the team table cannot be loaded, the text is empty,
/// or both backends fail.
pub(crate) async fn run_analyze(config: &AppConfig, text: &str) -> anyhow::Result<()> {
    let attributor = load_attributor(config)?;
    let resolver = SentimentResolver::from_config(config)?;

    let verdict = resolver.resolve(text).await?;
    let assignment = attributor.attribute(text);
    tracing::debug!(
        label = %verdict.label,
        model = %verdict.model_used,
        team = assignment.team_slug().unwrap_or("unassigned"),
        "text resolved"
    );
    print_verdict(&verdict, assignment.team_slug());
    Ok(())
}

/// Run one comment through the ingest pipeline.
///
/// A duplicate is reported, not treated as a failure.
///
/// # Errors
///
/// Returns an error for an unknown platform or team, an unattributable
/// comment, a failed analysis, or a store failure.
pub(crate) async fn run_ingest(
    config: &AppConfig,
    store: Arc<dyn RecordStore>,
    input: IngestInput,
) -> anyhow::Result<()> {
    let platform: Platform = input.platform.parse()?;
    let item = build_item(input.source_id, platform, input.author, input.text)?;

    let pipeline = IngestPipeline::new(
        Arc::new(load_attributor(config)?),
        Arc::new(SentimentResolver::from_config(config)?),
        IngestionGate::new(store),
        config.store_unassigned,
    );

    match pipeline.process(&item, input.team.as_deref()).await {
        Ok(record) => {
            tracing::info!(
                key = %record.item.key(),
                comment_id = record.comment_id,
                verdict_id = record.verdict_id,
                "comment stored"
            );
            println!(
                "stored {} as comment {} (verdict {})",
                record.item.key(),
                record.comment_id,
                record.verdict_id
            );
            print_verdict(&record.verdict, record.assignment.team_slug());
            Ok(())
        }
        Err(fanpulse_analytics::AnalyticsError::DuplicateItem(key)) => {
            tracing::info!(key = %key, "duplicate comment skipped");
            println!("{key} is already stored; skipped");
            Ok(())
        }
        Err(e) => {
            tracing::error!(key = %item.key(), error = %e, "ingest failed");
            Err(e.into())
        }
    }
}

fn build_item(
    source_id: String,
    platform: Platform,
    author: Option<String>,
    text: String,
) -> anyhow::Result<SourceItem> {
    let source_id = source_id.trim().to_string();
    if source_id.is_empty() {
        anyhow::bail!("--source-id must not be empty");
    }
    Ok(SourceItem {
        source_id,
        platform,
        text,
        author: author.unwrap_or_default(),
        observed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_item_trims_source_id() {
        let item = build_item(
            "  t3_abc ".to_string(),
            Platform::Reddit,
            None,
            "Cimbom".to_string(),
        )
        .unwrap();
        assert_eq!(item.source_id, "t3_abc");
        assert_eq!(item.author, "");
    }

    #[test]
    fn build_item_rejects_blank_source_id() {
        let err = build_item(" ".to_string(), Platform::Reddit, None, "x".to_string()).unwrap_err();
        assert!(err.to_string().contains("source-id"));
    }
}
