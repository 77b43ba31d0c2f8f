//! Read-side commands: comments, trends, insights, stats and cleanup.

use std::sync::Arc;

use chrono::Utc;
use fanpulse_analytics::{
    analyze_period, cleanup_duplicate_verdicts, rank_insights, Insight, Period, RecordQuery,
    RecordStore, TeamTrend, TrendBucketer,
};
use fanpulse_core::{AppConfig, Label, Platform, StoredRecord};

const MAX_PAGE_SIZE: u32 = 100;
const PREVIEW_CHARS: usize = 60;

pub(crate) struct CommentFilter {
    pub team: Option<String>,
    pub platform: Option<String>,
    pub label: Option<String>,
    pub author: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl CommentFilter {
    fn to_query(&self) -> anyhow::Result<RecordQuery> {
        let platform = self
            .platform
            .as_deref()
            .map(str::parse::<Platform>)
            .transpose()?;
        let label = self
            .label
            .as_deref()
            .map(|l| l.to_ascii_uppercase().parse::<Label>())
            .transpose()?;
        let limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        let page = self.page.max(1);

        Ok(RecordQuery {
            team: self.team.clone(),
            platform,
            label,
            author: self.author.clone(),
            from: None,
            to: None,
            limit,
            offset: u64::from(page - 1) * u64::from(limit),
        })
    }
}

/// Parse a period flag, rejecting values the API would silently default.
fn parse_period(value: &str) -> anyhow::Result<Period> {
    match value.trim() {
        "7d" | "30d" | "90d" => Ok(Period::from_param(Some(value))),
        other => anyhow::bail!("unknown period '{other}'; expected 7d, 30d or 90d"),
    }
}

fn format_trend_row(trend: &TeamTrend) -> String {
    let o = &trend.overall;
    let direction = if o.insufficient_data {
        "n/a".to_string()
    } else {
        format!("{:?}", o.trend_direction).to_lowercase()
    };
    format!(
        "{:<20}{:>9}{:>8.1}{:>8.1}{:>8.1}  {:<8}{:>+8.1}",
        trend.team_name,
        o.total_comments,
        o.positive_percent,
        o.negative_percent,
        o.neutral_percent,
        direction,
        o.weekly_change
    )
}

fn format_comment_row(record: &StoredRecord) -> String {
    let mut preview: String = record
        .item
        .text
        .chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if record.item.text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!(
        "{:<17}{:<14}{:<9}{:>+7.2}  {:<16}{}",
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.assignment.team_slug().unwrap_or("-"),
        record.verdict.label,
        record.verdict.signed_score(),
        record.item.author,
        preview
    )
}

fn format_insight_row(insight: &Insight) -> String {
    format!(
        "{:<8}{:<13}{:<20}{:<14}{}",
        format!("{:?}", insight.severity).to_lowercase(),
        format!("{:?}", insight.kind).to_lowercase(),
        insight.subject,
        insight.value,
        insight.description
    )
}

/// Print one page of stored comments, newest first.
///
/// # Errors
///
/// Returns an error for an unknown platform or label, or if the store fails.
pub(crate) async fn run_comments(
    store: Arc<dyn RecordStore>,
    filter: &CommentFilter,
    json: bool,
) -> anyhow::Result<()> {
    let query = filter.to_query()?;
    let page = store.list_records(&query).await?;
    tracing::debug!(
        total = page.total,
        returned = page.records.len(),
        offset = query.offset,
        "comments listed"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!(
        "{:<17}{:<14}{:<9}{:>7}  {:<16}TEXT",
        "CREATED", "TEAM", "LABEL", "SCORE", "AUTHOR"
    );
    for record in &page.records {
        println!("{}", format_comment_row(record));
    }
    println!(
        "showing {} of {} (page {})",
        page.records.len(),
        page.total,
        filter.page.max(1)
    );
    Ok(())
}

/// Print per-team trends for `period`.
///
/// # Errors
///
/// Returns an error for an unknown period or team, or if the store fails.
pub(crate) async fn run_trends(
    config: &AppConfig,
    store: Arc<dyn RecordStore>,
    period: &str,
    team: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let period = parse_period(period)?;
    let teams = fanpulse_core::load_teams(&config.teams_path)?;
    let bucketer = TrendBucketer::new(store);
    let today = Utc::now().date_naive();

    let trends: Vec<TeamTrend> = if let Some(slug) = team {
        let team = teams
            .find(slug)
            .ok_or_else(|| anyhow::anyhow!("team '{slug}' not found"))?;
        vec![bucketer.team_trend(team, period, today).await?]
    } else {
        let analysis = analyze_period(&bucketer, &teams.teams, period, today).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            return Ok(());
        }
        analysis.teams
    };
    tracing::info!(period = %period, teams = trends.len(), "trends computed");

    if json {
        println!("{}", serde_json::to_string_pretty(&trends)?);
        return Ok(());
    }

    println!(
        "{:<20}{:>9}{:>8}{:>8}{:>8}  {:<8}{:>8}",
        "TEAM", "COMMENTS", "POS%", "NEG%", "NEU%", "TREND", "CHANGE"
    );
    for trend in &trends {
        println!("{}", format_trend_row(trend));
    }
    Ok(())
}

/// Print ranked insights for `period`.
///
/// # Errors
///
/// Returns an error for an unknown period or if the store fails.
pub(crate) async fn run_insights(
    config: &AppConfig,
    store: Arc<dyn RecordStore>,
    period: &str,
    json: bool,
) -> anyhow::Result<()> {
    let period = parse_period(period)?;
    let teams = fanpulse_core::load_teams(&config.teams_path)?;
    let bucketer = TrendBucketer::new(store);
    let today = Utc::now().date_naive();
    let analysis = analyze_period(&bucketer, &teams.teams, period, today).await?;
    let insights = rank_insights(&analysis);
    tracing::info!(period = %period, insights = insights.len(), "insights ranked");

    if json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
        return Ok(());
    }

    if insights.is_empty() {
        println!("no insights for the last {period}");
        return Ok(());
    }

    println!(
        "{:<8}{:<13}{:<20}{:<14}DESCRIPTION",
        "LEVEL", "TYPE", "SUBJECT", "VALUE"
    );
    for insight in &insights {
        println!("{}", format_insight_row(insight));
    }
    Ok(())
}

/// Print label breakdown and confidence bands across all verdicts.
///
/// # Errors
///
/// Returns an error if the store fails.
pub(crate) async fn run_stats(store: Arc<dyn RecordStore>) -> anyhow::Result<()> {
    let o = store.sentiment_overview().await?;

    println!("total analysed:     {}", o.total);
    println!("average score:      {:+.3}", o.avg_signed_score);
    println!("average confidence: {:.3}", o.avg_confidence);
    println!(
        "labels:             positive {} / negative {} / neutral {}",
        o.positive, o.negative, o.neutral
    );
    println!(
        "confidence bands:   high {} / medium {} / low {}",
        o.high_confidence, o.medium_confidence, o.low_confidence
    );
    Ok(())
}

/// Remove duplicate verdicts, or list them with `dry_run`.
///
/// # Errors
///
/// Returns an error if the duplicate groups cannot be listed.
pub(crate) async fn run_cleanup(
    store: Arc<dyn RecordStore>,
    dry_run: bool,
) -> anyhow::Result<()> {
    if dry_run {
        let groups = store.duplicate_verdict_groups().await?;
        let extra: usize = groups
            .iter()
            .map(|g| g.verdict_ids.len().saturating_sub(1))
            .sum();
        tracing::info!(groups = groups.len(), duplicates = extra, "dry-run: nothing deleted");
        println!(
            "dry-run: {} comments carry {extra} duplicate verdicts",
            groups.len()
        );
        return Ok(());
    }

    let report = cleanup_duplicate_verdicts(store.as_ref()).await?;
    for error in &report.errors {
        tracing::warn!(error = %error, "duplicate group not cleaned");
    }
    println!(
        "cleanup complete: {} groups inspected, {} duplicates found, {} removed, {} failed",
        report.groups_inspected,
        report.duplicates_found,
        report.records_removed,
        report.errors.len()
    );
    Ok(())
}
