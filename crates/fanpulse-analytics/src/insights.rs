//! Severity-ranked findings derived from a [`TrendAnalysis`].

use std::cmp::Reverse;

use serde::Serialize;

use crate::trends::{TeamTrend, TrendAnalysis};

const CHANGE_THRESHOLD: f64 = 5.0;
const POSITIVE_SKEW_PERCENT: f64 = 60.0;
const NEGATIVE_SKEW_PERCENT: f64 = 40.0;
const MIN_COMMENTS_FOR_SKEW: u64 = 10;
const HIGH_ACTIVITY_COMMENTS: u64 = 100;
const BUSY_DAILY_AVERAGE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Improvement,
    Decline,
    Spike,
    Warning,
    Activity,
    Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    /// Team slug, or `None` for cross-team insights.
    pub team: Option<String>,
    pub subject: String,
    pub description: String,
    pub value: String,
    pub severity: Severity,
}

/// Derive insights from `analysis`, most severe first.
///
/// Per-team insights come before global ones and keep team order within a
/// severity level.
#[must_use]
pub fn rank_insights(analysis: &TrendAnalysis) -> Vec<Insight> {
    let period = analysis.period;
    let mut insights: Vec<Insight> = Vec::new();

    for trend in &analysis.teams {
        team_insights(trend, period.as_str(), &mut insights);
    }

    let summary = &analysis.summary;
    if summary.average_daily > BUSY_DAILY_AVERAGE {
        insights.push(Insight {
            kind: InsightKind::Spike,
            team: None,
            subject: "All teams".to_string(),
            description: format!(
                "Fans posted {:.0} comments a day on average over the last {period}",
                summary.average_daily
            ),
            value: format!("{:.0}/day", summary.average_daily),
            severity: Severity::Medium,
        });
    }
    if summary.total_comments > 0 {
        insights.push(Insight {
            kind: InsightKind::Trend,
            team: None,
            subject: "All teams".to_string(),
            description: format!(
                "{} comments analysed over the last {period}, {:.1} per day",
                summary.total_comments, summary.average_daily
            ),
            value: format!("{} comments", summary.total_comments),
            severity: Severity::Low,
        });
    }

    insights.sort_by_key(|insight| Reverse(insight.severity.rank()));
    insights
}

fn team_insights(trend: &TeamTrend, period: &str, out: &mut Vec<Insight>) {
    let o = &trend.overall;
    let name = &trend.team_name;
    let insight = |kind, description: String, value: String, severity| Insight {
        kind,
        team: Some(trend.team.clone()),
        subject: name.clone(),
        description,
        value,
        severity,
    };

    if o.weekly_change > CHANGE_THRESHOLD {
        out.push(insight(
            InsightKind::Improvement,
            format!(
                "{name} fan sentiment rose {:.1} points over the last week",
                o.weekly_change
            ),
            format!("{:+.1}%", o.weekly_change),
            Severity::High,
        ));
    }
    if o.weekly_change < -CHANGE_THRESHOLD {
        out.push(insight(
            InsightKind::Decline,
            format!(
                "{name} fan sentiment fell {:.1} points over the last week",
                o.weekly_change.abs()
            ),
            format!("{:+.1}%", o.weekly_change),
            Severity::High,
        ));
    }
    if o.positive_percent > POSITIVE_SKEW_PERCENT && o.total_comments > MIN_COMMENTS_FOR_SKEW {
        out.push(insight(
            InsightKind::Spike,
            format!(
                "{name} fans are {:.1}% positive over the last {period}",
                o.positive_percent
            ),
            format!("{:.1}%", o.positive_percent),
            Severity::Medium,
        ));
    }
    if o.negative_percent > NEGATIVE_SKEW_PERCENT && o.total_comments > MIN_COMMENTS_FOR_SKEW {
        out.push(insight(
            InsightKind::Warning,
            format!(
                "{name} fans are {:.1}% negative over the last {period}",
                o.negative_percent
            ),
            format!("{:.1}%", o.negative_percent),
            Severity::Medium,
        ));
    }
    if o.total_comments > HIGH_ACTIVITY_COMMENTS {
        out.push(insight(
            InsightKind::Activity,
            format!(
                "{name} drew {} fan comments over the last {period}",
                o.total_comments
            ),
            format!("{} comments", o.total_comments),
            Severity::Low,
        ));
    }
}
