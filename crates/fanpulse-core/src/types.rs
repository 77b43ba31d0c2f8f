use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Three-way sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Positive,
    Negative,
    Neutral,
}

impl Label {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Positive => "POSITIVE",
            Label::Negative => "NEGATIVE",
            Label::Neutral => "NEUTRAL",
        }
    }

    /// Signed contribution of a verdict with this label to a daily mean.
    ///
    /// `+score` for positive, `-score` for negative, `0` for neutral.
    #[must_use]
    pub fn signed(self, score: f64) -> f64 {
        match self {
            Label::Positive => score,
            Label::Negative => -score,
            Label::Neutral => 0.0,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = CoreError;

    /// Strict parse of the stored form. Lenient backend output goes through
    /// the sentiment crate's label normaliser instead.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POSITIVE" => Ok(Label::Positive),
            "NEGATIVE" => Ok(Label::Negative),
            "NEUTRAL" => Ok(Label::Neutral),
            other => Err(CoreError::UnknownLabel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Reddit,
    Youtube,
    Twitter,
    Instagram,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(Platform::Reddit),
            "youtube" => Ok(Platform::Youtube),
            "twitter" | "x" => Ok(Platform::Twitter),
            "instagram" => Ok(Platform::Instagram),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Identity of a source item. Unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    pub source_id: String,
    pub platform: Platform,
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.source_id)
    }
}

/// A short piece of fan-authored text collected from a social platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    pub source_id: String,
    pub platform: Platform,
    pub text: String,
    pub author: String,
    pub observed_at: DateTime<Utc>,
}

impl SourceItem {
    #[must_use]
    pub fn key(&self) -> SourceKey {
        SourceKey {
            source_id: self.source_id.clone(),
            platform: self.platform,
        }
    }
}

/// Which rule of the fusion policy produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "hybrid-consensus")]
    HybridConsensus,
    #[serde(rename = "hybrid-a-primary")]
    HybridAPrimary,
    #[serde(rename = "hybrid-b-primary")]
    HybridBPrimary,
    #[serde(rename = "a-only")]
    AOnly,
    #[serde(rename = "b-only")]
    BOnly,
}

impl Provenance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::HybridConsensus => "hybrid-consensus",
            Provenance::HybridAPrimary => "hybrid-a-primary",
            Provenance::HybridBPrimary => "hybrid-b-primary",
            Provenance::AOnly => "a-only",
            Provenance::BOnly => "b-only",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hybrid-consensus" => Ok(Provenance::HybridConsensus),
            "hybrid-a-primary" => Ok(Provenance::HybridAPrimary),
            "hybrid-b-primary" => Ok(Provenance::HybridBPrimary),
            "a-only" => Ok(Provenance::AOnly),
            "b-only" => Ok(Provenance::BOnly),
            other => Err(CoreError::UnknownProvenance(other.to_string())),
        }
    }
}

/// Resolved sentiment for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: Label,
    /// Magnitude of the dominant class, in [0, 1].
    pub score: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub model_used: Provenance,
    pub produced_at: DateTime<Utc>,
}

impl Verdict {
    /// Build a verdict, clamping `score` and `confidence` into [0, 1].
    ///
    /// Non-finite inputs clamp to 0.
    #[must_use]
    pub fn new(
        label: Label,
        score: f64,
        confidence: f64,
        model_used: Provenance,
        produced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            label,
            score: clamp_unit(score),
            confidence: clamp_unit(confidence),
            model_used,
            produced_at,
        }
    }

    /// Signed score of this verdict (`+score`, `-score` or `0`).
    #[must_use]
    pub fn signed_score(&self) -> f64 {
        self.label.signed(self.score)
    }
}

/// Clamp a value into the unit interval, mapping NaN to 0.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Team attribution of a source item, fixed at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityAssignment {
    Team(String),
    Unassigned,
}

impl EntityAssignment {
    #[must_use]
    pub fn team_slug(&self) -> Option<&str> {
        match self {
            EntityAssignment::Team(slug) => Some(slug),
            EntityAssignment::Unassigned => None,
        }
    }

    #[must_use]
    pub fn from_slug(slug: Option<String>) -> Self {
        slug.map_or(EntityAssignment::Unassigned, EntityAssignment::Team)
    }
}

/// A persisted item together with its attribution and verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub comment_id: i64,
    pub verdict_id: i64,
    pub item: SourceItem,
    pub assignment: EntityAssignment,
    pub verdict: Verdict,
    pub created_at: DateTime<Utc>,
}
