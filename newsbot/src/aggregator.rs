//! News search across one or more feed sources.
//!
//! `search` fetches every configured source once, pools the entries, prefers the
//! ones published inside the trailing window, removes duplicate titles, orders by
//! date (newest first) and returns one page. Every failure degrades to fewer (or no)
//! results; nothing here returns an error to the caller.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, Utc};
use common::{DedupStage, FeedSourceConfig, NewsConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ingestion::{FeedEntry, FeedFetcher};

/// One search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub summary_text: String,
    pub link: String,
}

/// Entry with the date used for windowing and ordering
#[derive(Debug, Clone)]
struct Candidate {
    record: ArticleRecord,
    date: DateTime<Utc>,
}

pub struct NewsAggregator {
    fetcher: Arc<dyn FeedFetcher>,
    config: NewsConfig,
    tz: FixedOffset,
}

impl NewsAggregator {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, config: NewsConfig) -> Self {
        let tz = utc_offset(config.utc_offset_hours);
        Self { fetcher, config, tz }
    }

    /// Timezone that decides what "today" means
    pub fn timezone(&self) -> FixedOffset {
        self.tz
    }

    /// Entries `[offset, offset + page_size)` of the filtered, deduplicated, sorted pool
    pub async fn search(&self, query: &str, offset: usize, page_size: usize) -> Vec<ArticleRecord> {
        let now = Utc::now();

        let mut pool = Vec::new();
        for source in &self.config.sources {
            let entries = self.fetch_source(source, query).await;
            pool.extend(entries.into_iter().map(|e| candidate(e, now)));
        }

        if pool.is_empty() {
            info!(query, "news search returned no entries");
            return Vec::new();
        }

        let selected = self.select(pool, now);
        let mut page = paginate(selected, offset, page_size);

        if self.config.scrape_short_summaries {
            for record in &mut page {
                self.enrich_summary(record).await;
            }
        }

        info!(query, offset, returned = page.len(), "news search complete");
        page
    }

    /// One source, capped. Failures contribute nothing.
    async fn fetch_source(&self, source: &FeedSourceConfig, query: &str) -> Vec<FeedEntry> {
        let url = search_url(&source.url_template, query);
        match self.fetcher.fetch_entries(&url).await {
            Ok(mut entries) => {
                entries.truncate(source.cap);
                debug!(source = %source.name, count = entries.len(), "feed source fetched");
                entries
            }
            Err(e) => {
                warn!(source = %source.name, "feed source failed: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Window (with fallback), dedup and sort, in the configured order.
    fn select(&self, pool: Vec<Candidate>, now: DateTime<Utc>) -> Vec<ArticleRecord> {
        let pool = match self.config.dedup_stage {
            DedupStage::BeforeWindow => dedup_by_title(pool),
            DedupStage::AfterWindow => pool,
        };

        let windowed = self.apply_window(pool, now);

        let mut result = match self.config.dedup_stage {
            DedupStage::BeforeWindow => windowed,
            DedupStage::AfterWindow => dedup_by_title(windowed),
        };

        sort_newest_first(&mut result);
        result.into_iter().map(|c| c.record).collect()
    }

    fn apply_window(&self, pool: Vec<Candidate>, now: DateTime<Utc>) -> Vec<Candidate> {
        let today = now.with_timezone(&self.tz).date_naive();
        let lookback = Days::new(u64::try_from(self.config.lookback_days).unwrap_or(0));
        let earliest = today.checked_sub_days(lookback).unwrap_or(NaiveDate::MIN);

        let fresh: Vec<Candidate> = pool
            .iter()
            .filter(|c| {
                let day = c.date.with_timezone(&self.tz).date_naive();
                day >= earliest && day <= today
            })
            .cloned()
            .collect();

        if fresh.len() >= self.config.min_fresh {
            return fresh;
        }

        debug!(
            fresh = fresh.len(),
            min_fresh = self.config.min_fresh,
            "too few fresh entries, using the whole pool"
        );
        let mut all = pool;
        sort_newest_first(&mut all);
        all.truncate(self.config.fallback_cap);
        all
    }

    /// Replace a short feed summary with the article page text when that is longer.
    async fn enrich_summary(&self, record: &mut ArticleRecord) {
        if record.link.is_empty()
            || record.summary_text.chars().count() >= self.config.scrape_min_chars
        {
            return;
        }

        match self.fetcher.fetch_article_text(&record.link).await {
            Ok(text) if text.chars().count() > record.summary_text.chars().count() => {
                debug!(link = %record.link, chars = text.chars().count(), "using scraped article text");
                record.summary_text = text;
            }
            Ok(_) => debug!(link = %record.link, "scraped text not longer, keeping feed text"),
            Err(e) => warn!(link = %record.link, "failed to scrape article: {:#}", e),
        }
    }
}

fn candidate(entry: FeedEntry, now: DateTime<Utc>) -> Candidate {
    Candidate {
        date: entry.published.unwrap_or(now),
        record: ArticleRecord {
            title: entry.title,
            published_at: entry.published,
            summary_text: entry.summary,
            link: entry.link,
        },
    }
}

/// Substitute the URL-encoded query into a source template
pub fn search_url(template: &str, query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    template.replace("{query}", &encoded)
}

/// Fixed offset for `hours`, UTC when out of range
pub fn utc_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Keep the first occurrence of each exact title
fn dedup_by_title(pool: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    pool.into_iter()
        .filter(|c| seen.insert(c.record.title.clone()))
        .collect()
}

/// Stable: equal dates keep their pool order
fn sort_newest_first(pool: &mut [Candidate]) {
    pool.sort_by(|a, b| b.date.cmp(&a.date));
}

fn paginate(items: Vec<ArticleRecord>, offset: usize, page_size: usize) -> Vec<ArticleRecord> {
    items.into_iter().skip(offset).take(page_size).collect()
}
