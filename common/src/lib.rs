/*!
common/src/lib.rs

Shared configuration types for newsbot.

This file provides:
- Config data structures (deserialized from TOML), every section optional
- A default/override loader that merges two TOML files key by key
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTP server configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the chat UI binds to (e.g. "127.0.0.1")
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Which request field carries the output token budget.
///
/// Newer OpenAI models reject `max_tokens`, most self-hosted endpoints only know it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenParam {
    MaxTokens,
    MaxCompletionTokens,
}

/// Remote completion endpoint (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Full URL of the chat completions endpoint
    pub api_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub token_param: TokenParam,
    /// Only sent when set; some models accept nothing but the default
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-5-nano".to_string(),
            timeout_seconds: 60,
            token_param: TokenParam::MaxCompletionTokens,
            temperature: None,
        }
    }
}

/// Conversation persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the conversation history
    pub history_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_path: "conversation.json".to_string(),
        }
    }
}

/// Keyword intent detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    pub keywords: Vec<String>,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            keywords: ["기사", "뉴스", "보도", "검색"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

/// One feed search endpoint. `{query}` in the template is replaced by the URL-encoded query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    pub name: String,
    pub url_template: String,
    /// Maximum number of entries taken from this source
    #[serde(default = "default_source_cap")]
    pub cap: usize,
}

fn default_source_cap() -> usize {
    20
}

/// Where title deduplication happens relative to the freshness window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStage {
    BeforeWindow,
    AfterWindow,
}

/// Upper bound accepted for `news.lookback_days`
pub const MAX_LOOKBACK_DAYS: i64 = 365;

/// News aggregation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Articles returned per news request (and offset step)
    pub page_size: usize,
    pub sources: Vec<FeedSourceConfig>,
    /// Days before today still considered fresh (1 = today or yesterday)
    pub lookback_days: i64,
    /// Minimum number of fresh entries before the window is abandoned
    pub min_fresh: usize,
    /// Size of the date-sorted pool used when the window is abandoned
    pub fallback_cap: usize,
    pub dedup_stage: DedupStage,
    /// Offset used to decide what "today" is
    pub utc_offset_hours: i32,
    pub fetch_timeout_seconds: u64,
    /// Fetch the article page when the feed text is too short
    pub scrape_short_summaries: bool,
    pub scrape_min_chars: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            sources: vec![FeedSourceConfig {
                name: "google-news".to_string(),
                url_template:
                    "https://news.google.com/rss/search?q={query}&hl=ko&gl=KR&ceid=KR:ko"
                        .to_string(),
                cap: default_source_cap(),
            }],
            lookback_days: 1,
            min_fresh: 3,
            fallback_cap: 20,
            dedup_stage: DedupStage::AfterWindow,
            utc_offset_hours: 9,
            fetch_timeout_seconds: 10,
            scrape_short_summaries: false,
            scrape_min_chars: 200,
        }
    }
}

/// Article summarization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Below this many characters the service is not called
    pub min_chars: usize,
    /// Input is cut to this many characters before being sent
    pub max_input_chars: usize,
    pub max_tokens: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            min_chars: 20,
            max_input_chars: 1500,
            max_tokens: 256,
        }
    }
}

/// General chat replies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of past turns sent with each message; 0 sends the whole log
    pub history_limit: usize,
    pub max_tokens: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            max_tokens: 512,
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub intent: IntentConfig,
    pub news: NewsConfig,
    pub summarizer: SummarizerConfig,
    pub chat: ChatConfig,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing keys fall back to the built-in defaults.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (path, label) in [(default_path, "default"), (override_path, "override")] {
            if let Some(path) = path {
                if path.exists() {
                    let data = tokio::fs::read_to_string(path).await
                        .with_context(|| format!("Failed to read {} config: {}", label, path.display()))?;
                    let val: toml::Value = toml::from_str(&data)
                        .with_context(|| format!("Failed to parse {} configuration", label))?;
                    merge_toml(&mut config_value, val);
                }
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would make the news pipeline or summarizer meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.news.page_size == 0 {
            anyhow::bail!("news.page_size must be at least 1");
        }
        if !(0..=MAX_LOOKBACK_DAYS).contains(&self.news.lookback_days) {
            anyhow::bail!("news.lookback_days must be between 0 and {}", MAX_LOOKBACK_DAYS);
        }
        if !(-23..=23).contains(&self.news.utc_offset_hours) {
            anyhow::bail!("news.utc_offset_hours must be between -23 and 23");
        }
        for source in &self.news.sources {
            if !source.url_template.contains("{query}") {
                anyhow::bail!("feed source '{}' has no {{query}} placeholder", source.name);
            }
        }
        if self.summarizer.max_input_chars < self.summarizer.min_chars {
            anyhow::bail!("summarizer.max_input_chars must be >= summarizer.min_chars");
        }
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
