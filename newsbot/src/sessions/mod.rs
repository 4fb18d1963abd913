use anyhow::Result;
use chrono::Utc;
use common::{ChatConfig, Config, SummarizerConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregator::{ArticleRecord, NewsAggregator};
use crate::chat;
use crate::conversation::{ConversationLog, ConversationStore, Turn};
use crate::ingestion::HttpFeedFetcher;
use crate::intent::{Intent, IntentClassifier, KeywordClassifier};
use crate::llm::summarizer::summarize_article;
use crate::llm::LlmProvider;

pub mod websocket;

/// Shown when a news search finds nothing
pub const NO_RESULTS: &str = "검색 결과가 없습니다.\n다른 키워드로 검색해보세요.";

/// Where the session is within one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingInput,
    Classifying,
    Aggregating,
    Responding,
    Rendering,
    Persisting,
}

/// Outcome of one user message
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub intent: Intent,
    pub reply: String,
}

/// The single chat session: history, news cursor and the collaborators that serve it.
pub struct ChatSession {
    log: ConversationLog,
    offset: usize,
    phase: Phase,
    store: ConversationStore,
    classifier: Box<dyn IntentClassifier>,
    aggregator: NewsAggregator,
    provider: Arc<dyn LlmProvider>,
    summarizer: SummarizerConfig,
    chat: ChatConfig,
    page_size: usize,
}

impl ChatSession {
    /// Load the persisted history and assemble a session.
    pub async fn open(
        store: ConversationStore,
        classifier: Box<dyn IntentClassifier>,
        aggregator: NewsAggregator,
        provider: Arc<dyn LlmProvider>,
        config: &Config,
    ) -> Self {
        let log = store.load().await;
        info!(
            path = %store.path().display(),
            turns = log.len(),
            "chat session opened"
        );

        Self {
            log,
            offset: 0,
            phase: Phase::Idle,
            store,
            classifier,
            aggregator,
            provider,
            summarizer: config.summarizer.clone(),
            chat: config.chat.clone(),
            page_size: config.news.page_size,
        }
    }

    /// Session wired to the HTTP feed fetcher, keyword classifier and history file from `config`.
    pub async fn from_config(config: &Config, provider: Arc<dyn LlmProvider>) -> Result<Self> {
        let fetcher = HttpFeedFetcher::new(config.news.fetch_timeout_seconds)?;
        let aggregator = NewsAggregator::new(Arc::new(fetcher), config.news.clone());
        let classifier = KeywordClassifier::new(config.intent.keywords.clone());
        let store = ConversationStore::new(&config.storage.history_path);

        Ok(Self::open(store, Box::new(classifier), aggregator, provider, config).await)
    }

    pub fn history(&self) -> &ConversationLog {
        &self.log
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run one exchange to completion. Blank input is ignored.
    pub async fn handle(&mut self, input: &str) -> Option<Exchange> {
        self.enter(Phase::AwaitingInput);
        let input = input.trim();
        if input.is_empty() {
            self.enter(Phase::Idle);
            return None;
        }

        self.enter(Phase::Classifying);
        let intent = self.classifier.classify(input);
        info!(?intent, offset = self.offset, "user message classified");

        let reply = match intent {
            Intent::News => {
                self.enter(Phase::Aggregating);
                let articles = self.aggregator.search(input, self.offset, self.page_size).await;
                self.offset += self.page_size;
                self.enter(Phase::Rendering);
                self.render_news(&articles).await
            }
            Intent::Chat => {
                self.enter(Phase::Responding);
                let reply = chat::respond(self.provider.as_ref(), &self.log, input, &self.chat).await;
                self.offset = 0;
                self.enter(Phase::Rendering);
                reply
            }
        };

        self.enter(Phase::Persisting);
        self.log.push(Turn::user(input));
        self.log.push(Turn::assistant(reply.clone()));
        self.store.save(&self.log).await;

        self.enter(Phase::Idle);
        Some(Exchange { intent, reply })
    }

    /// Numbered list of articles, each summarized in three lines
    async fn render_news(&self, articles: &[ArticleRecord]) -> String {
        if articles.is_empty() {
            return NO_RESULTS.to_string();
        }

        let tz = self.aggregator.timezone();
        let mut response = String::new();
        for (idx, article) in articles.iter().enumerate() {
            let summary =
                summarize_article(self.provider.as_ref(), &article.summary_text, &self.summarizer).await;
            let date = article
                .published_at
                .unwrap_or_else(Utc::now)
                .with_timezone(&tz)
                .format("%Y-%m-%d %H:%M");

            response.push_str(&format!(
                "{}. [{}] {}\n{}\n🔗 {}\n\n",
                idx + 1,
                date,
                article.title,
                summary,
                article.link
            ));
        }
        response
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "session phase");
        self.phase = phase;
    }
}
