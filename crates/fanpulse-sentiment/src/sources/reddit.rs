//! Read-only Reddit collector using the public JSON listings.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use fanpulse_core::{Platform, SourceItem};
use serde::Deserialize;

use crate::error::SentimentError;
use crate::preprocess::clean_text;

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    title: Option<String>,
    selftext: Option<String>,
    author: Option<String>,
    created_utc: Option<f64>,
}

pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl RedditClient {
    /// # Errors
    ///
    /// Returns [`SentimentError::Reddit`] if the HTTP client cannot be built.
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, SentimentError> {
        Self::with_base_url(DEFAULT_BASE_URL, user_agent, timeout)
    }

    /// Point the client at a different host. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Reddit`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SentimentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SentimentError::Reddit(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        })
    }

    /// Fetch the newest posts of `subreddit` created after `since`.
    ///
    /// Posts with no usable text (deleted, removed, empty) are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Reddit`] on a non-2xx status or an
    /// unparseable listing, [`SentimentError::Http`] on transport failure.
    pub async fn fetch_new_posts(
        &self,
        subreddit: &str,
        limit: u32,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourceItem>, SentimentError> {
        let url = format!("{}/r/{subreddit}/new.json", self.base_url);
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .query(&[
                ("limit", limit.clamp(1, MAX_LIMIT).to_string()),
                ("raw_json", "1".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SentimentError::Reddit(format!(
                "r/{subreddit} listing failed with status {}",
                response.status()
            )));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| SentimentError::Reddit(format!("Reddit response parse error: {e}")))?;

        let items: Vec<SourceItem> = listing
            .data
            .children
            .into_iter()
            .filter_map(|post| to_source_item(post.data))
            .filter(|item| item.observed_at > since)
            .collect();

        tracing::debug!(subreddit, count = items.len(), "collected Reddit posts");
        Ok(items)
    }
}

fn to_source_item(post: PostData) -> Option<SourceItem> {
    let title = post.title.as_deref().map(str::trim).unwrap_or_default();
    let body = post
        .selftext
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty() && *b != "[deleted]" && *b != "[removed]");

    let raw = match body {
        Some(body) if !title.is_empty() => format!("{title} {body}"),
        Some(body) => body.to_string(),
        None => title.to_string(),
    };
    let text = clean_text(&decode_entities(&raw));
    if text.is_empty() {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let observed_at = post
        .created_utc
        .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single())
        .unwrap_or_else(Utc::now);

    Some(SourceItem {
        source_id: post.id,
        platform: Platform::Reddit,
        text,
        author: post.author.unwrap_or_default(),
        observed_at,
    })
}

/// Undo the HTML escaping Reddit applies to post text.
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
