//! Per-team daily buckets, rolling trend direction and cross-team summaries.
//!
//! Days are UTC calendar days. A bucket counts the verdicts whose row was
//! created inside `[day 00:00, next day 00:00)`; its score is the mean of
//! the signed verdict scores (`+score` positive, `-score` negative, `0`
//! neutral). Trend direction looks only at the last seven buckets and
//! compares the mean of the first two against the mean of the last two.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use fanpulse_core::TeamConfig;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;

use crate::error::AnalyticsError;
use crate::store::{DayTally, RecordStore, StoreError};

/// Longest range a single bucket request may span, in days.
pub const MAX_RANGE_DAYS: i64 = 366;

const DAY_QUERY_CONCURRENCY: usize = 8;
const TREND_WINDOW: usize = 7;
const MIN_POPULATED_DAYS: usize = 4;
const DIRECTION_THRESHOLD: f64 = 0.1;
const MIN_COMMENTS_FOR_NEGATIVE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl Period {
    /// Parse `7d`, `30d` or `90d`; anything else (or nothing) means `7d`.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("30d") => Period::Month,
            Some("90d") => Period::Quarter,
            _ => Period::Week,
        }
    }

    #[must_use]
    pub fn days(self) -> u32 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Week => "7d",
            Period::Month => "30d",
            Period::Quarter => "90d",
        }
    }

    /// The `days()` calendar days ending on `today`, inclusive.
    #[must_use]
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = today - Duration::days(i64::from(self.days()) - 1);
        (start, today)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub total: u64,
    /// Mean signed score in [-1, 1]; 0 for an empty day.
    pub score: f64,
}

impl DayBucket {
    fn from_tally(date: NaiveDate, tally: DayTally) -> Self {
        let total = tally.total();
        let score = if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let denom = total as f64;
            tally.signed_sum / denom
        };
        Self {
            date,
            positive: tally.positive,
            negative: tally.negative,
            neutral: tally.neutral,
            total,
            score,
        }
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.total > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamOverall {
    pub total_comments: u64,
    pub positive_percent: f64,
    pub negative_percent: f64,
    pub neutral_percent: f64,
    pub trend_direction: TrendDirection,
    /// Change of the mean daily score in percentage points.
    pub weekly_change: f64,
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamTrend {
    pub team: String,
    pub team_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data: Vec<DayBucket>,
    pub overall: TeamOverall,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSummary {
    pub total_comments: u64,
    pub most_positive_team: Option<String>,
    pub most_negative_team: Option<String>,
    pub biggest_improvement: Option<String>,
    pub biggest_decline: Option<String>,
    pub average_daily: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub period: Period,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
    pub teams: Vec<TeamTrend>,
    pub summary: TrendSummary,
}

/// Overall stats for a bucket series.
#[must_use]
pub fn compute_overall(buckets: &[DayBucket]) -> TeamOverall {
    let total: u64 = buckets.iter().map(|b| b.total).sum();
    let positive: u64 = buckets.iter().map(|b| b.positive).sum();
    let negative: u64 = buckets.iter().map(|b| b.negative).sum();
    let neutral: u64 = buckets.iter().map(|b| b.neutral).sum();

    let percent = |count: u64| {
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = count as f64 / total as f64;
            ratio * 100.0
        }
    };

    let window = &buckets[buckets.len().saturating_sub(TREND_WINDOW)..];
    let populated = window.iter().filter(|b| b.is_populated()).count();

    let (trend_direction, weekly_change, insufficient_data) = if populated < MIN_POPULATED_DAYS {
        (TrendDirection::Stable, 0.0, true)
    } else {
        let n = window.len();
        let first_half = (window[0].score + window[1].score) / 2.0;
        let second_half = (window[n - 2].score + window[n - 1].score) / 2.0;
        let change = second_half - first_half;
        let direction = if change > DIRECTION_THRESHOLD {
            TrendDirection::Up
        } else if change < -DIRECTION_THRESHOLD {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };
        (direction, change * 100.0, false)
    };

    TeamOverall {
        total_comments: total,
        positive_percent: percent(positive),
        negative_percent: percent(negative),
        neutral_percent: percent(neutral),
        trend_direction,
        weekly_change,
        insufficient_data,
    }
}

/// Builds gap-free daily series from store tallies.
#[derive(Clone)]
pub struct TrendBucketer {
    store: Arc<dyn RecordStore>,
}

impl TrendBucketer {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// One bucket per day in `[start, end]`, ascending, empty days included.
    ///
    /// Day queries run concurrently with bounded parallelism. `end < start`
    /// yields an empty series.
    ///
    /// # Errors
    ///
    /// - [`AnalyticsError::InvalidRange`] if the range exceeds
    ///   [`MAX_RANGE_DAYS`].
    /// - [`AnalyticsError::Store`] if any day query fails.
    pub async fn bucket(
        &self,
        team_slug: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayBucket>, AnalyticsError> {
        if end < start {
            return Ok(Vec::new());
        }

        let span = (end - start).num_days() + 1;
        if span > MAX_RANGE_DAYS {
            return Err(AnalyticsError::InvalidRange(format!(
                "{span} days requested, at most {MAX_RANGE_DAYS} allowed"
            )));
        }

        let store = self.store.as_ref();
        let buckets: Vec<DayBucket> = stream::iter(start.iter_days().take_while(|d| *d <= end))
            .map(|date| async move {
                let (from, to) = day_bounds(date);
                let tally = store.tally_window(team_slug, from, to).await?;
                Ok::<_, StoreError>(DayBucket::from_tally(date, tally))
            })
            .buffered(DAY_QUERY_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(buckets)
    }

    /// Bucket `team` over `period` ending on `today` and compute its overall stats.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Store`] if any day query fails.
    pub async fn team_trend(
        &self,
        team: &TeamConfig,
        period: Period,
        today: NaiveDate,
    ) -> Result<TeamTrend, AnalyticsError> {
        let (start, end) = period.window(today);
        let data = self.bucket(&team.slug, start, end).await?;
        let overall = compute_overall(&data);
        Ok(TeamTrend {
            team: team.slug.clone(),
            team_name: team.name.clone(),
            start_date: start,
            end_date: end,
            data,
            overall,
        })
    }
}

/// Trend every configured team over `period` and summarise across teams.
///
/// A team whose queries fail is logged and left out.
///
/// # Errors
///
/// Returns the last [`AnalyticsError`] when teams are configured but every
/// one of them failed.
pub async fn analyze_period(
    bucketer: &TrendBucketer,
    teams: &[TeamConfig],
    period: Period,
    today: NaiveDate,
) -> Result<TrendAnalysis, AnalyticsError> {
    let (start_date, end_date) = period.window(today);
    let mut trends = Vec::with_capacity(teams.len());
    let mut last_error = None;

    for team in teams {
        match bucketer.team_trend(team, period, today).await {
            Ok(trend) => {
                tracing::debug!(
                    team = %team.slug,
                    comments = trend.overall.total_comments,
                    positive_percent = trend.overall.positive_percent,
                    "team trend computed"
                );
                trends.push(trend);
            }
            Err(e) => {
                tracing::warn!(team = %team.slug, error = %e, "team trend failed, skipping");
                last_error = Some(e);
            }
        }
    }

    if trends.is_empty() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    let summary = summarize(&trends, period.days());
    tracing::info!(
        period = %period,
        teams = trends.len(),
        comments = summary.total_comments,
        "trend analysis complete"
    );

    Ok(TrendAnalysis {
        period,
        start_date,
        end_date,
        days: period.days(),
        teams: trends,
        summary,
    })
}

fn summarize(trends: &[TeamTrend], days: u32) -> TrendSummary {
    let total_comments: u64 = trends.iter().map(|t| t.overall.total_comments).sum();

    let mut most_positive: Option<&TeamTrend> = None;
    let mut most_negative: Option<&TeamTrend> = None;
    let mut improvement: Option<&TeamTrend> = None;
    let mut decline: Option<&TeamTrend> = None;

    for trend in trends {
        let o = &trend.overall;
        if most_positive.is_none_or(|best| o.positive_percent > best.overall.positive_percent) {
            most_positive = Some(trend);
        }
        if o.total_comments > MIN_COMMENTS_FOR_NEGATIVE
            && most_negative.is_none_or(|worst| o.positive_percent < worst.overall.positive_percent)
        {
            most_negative = Some(trend);
        }
        if improvement.is_none_or(|best| o.weekly_change > best.overall.weekly_change) {
            improvement = Some(trend);
        }
        if decline.is_none_or(|worst| o.weekly_change < worst.overall.weekly_change) {
            decline = Some(trend);
        }
    }

    let name = |t: Option<&TeamTrend>| t.map(|t| t.team_name.clone());

    #[allow(clippy::cast_precision_loss)]
    let average_daily = if days == 0 {
        0.0
    } else {
        total_comments as f64 / f64::from(days)
    };

    TrendSummary {
        total_comments,
        most_positive_team: name(most_positive),
        most_negative_team: name(most_negative),
        biggest_improvement: name(improvement),
        biggest_decline: name(decline),
        average_daily,
    }
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}
