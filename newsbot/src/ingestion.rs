use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::scraping;

/// One article-like item of a feed, reduced to what the aggregator needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// Plain text (HTML already stripped)
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
}

/// Source of feed entries and article pages.
///
/// Implementations make exactly one attempt per call; the aggregator decides what a
/// failure means.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>>;

    /// Main readable text of the page at `url`
    async fn fetch_article_text(&self, url: &str) -> Result<String>;
}

/// HTTP fetcher backed by reqwest + feed-rs
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("newsbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let feed = fetch_and_parse_feed(&self.client, url).await?;
        Ok(feed.entries.iter().map(FeedEntry::from_entry).collect())
    }

    async fn fetch_article_text(&self, url: &str) -> Result<String> {
        scraping::scrape_article_content(&self.client, url).await
    }
}

/// Fetches a feed from the given URL and parses it. One attempt, no retries.
pub async fn fetch_and_parse_feed(client: &Client, url: &str) -> Result<Feed> {
    let response = client.get(url).send().await.context("failed to fetch feed")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("feed fetch failed with status: {}", status));
    }

    let bytes = response.bytes().await.context("failed to read response body")?;
    let feed = parser::parse(bytes.as_ref()).context("failed to parse feed")?;
    debug!(url, entries = feed.entries.len(), "feed parsed");

    Ok(feed)
}

impl FeedEntry {
    pub fn from_entry(entry: &Entry) -> Self {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();
        // Use the first link as the URL
        let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();

        let raw = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .unwrap_or_default();

        Self {
            title,
            link,
            summary: html_to_text(&raw),
            published: entry.published.or(entry.updated),
        }
    }
}

/// Convert an HTML fragment to plain text, dropping link footnotes.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let text = match html2text::from_read(html.as_bytes(), 120) {
        Ok(text) => text,
        Err(e) => {
            warn!("failed to convert feed HTML to text: {}", e);
            return html.trim().to_string();
        }
    };

    text.lines()
        .filter(|line| !is_footnote(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// `[12]: https://...` reference lines emitted for anchors
fn is_footnote(line: &str) -> bool {
    let Some(rest) = line.trim_start().strip_prefix('[') else {
        return false;
    };
    match rest.split_once("]:") {
        Some((n, _)) => !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}
