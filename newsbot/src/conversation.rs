//! Conversation history and its JSON file persistence.
//!
//! The history file is a pretty-printed JSON array of `{role, content}` objects.
//! Loading never fails (a missing or corrupt file is an empty log) and saving is
//! best-effort: errors are logged, not returned, unless the caller uses `try_save`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::llm::{ChatMessage, MessageRole};

/// Speaker of a persisted turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message exchanged in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        };
        ChatMessage { role, content: turn.content.clone() }
    }
}

/// Ordered, append-only list of turns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns, or all of them when `n` is `None`
    pub fn recent(&self, n: Option<usize>) -> &[Turn] {
        match n {
            Some(n) => &self.turns[self.turns.len().saturating_sub(n)..],
            None => &self.turns,
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// JSON file backing a single conversation
#[derive(Debug, Clone)]
pub struct ConversationStore {
    path: PathBuf,
}

impl ConversationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted log, or an empty one if the file is absent or unparsable.
    pub async fn load(&self) -> ConversationLog {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no conversation history yet");
                return ConversationLog::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read conversation history: {}", e);
                return ConversationLog::new();
            }
        };

        match serde_json::from_str::<ConversationLog>(&data) {
            Ok(log) => {
                debug!(path = %self.path.display(), turns = log.len(), "conversation history loaded");
                log
            }
            Err(e) => {
                warn!(path = %self.path.display(), "conversation history is not valid JSON, starting empty: {}", e);
                ConversationLog::new()
            }
        }
    }

    /// Overwrite the file with `log`. Failures are logged and ignored.
    pub async fn save(&self, log: &ConversationLog) {
        if let Err(e) = self.try_save(log).await {
            warn!(path = %self.path.display(), "failed to save conversation history: {:#}", e);
        }
    }

    /// Write to a sibling temp file, then rename it over the target.
    pub async fn try_save(&self, log: &ConversationLog) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create history directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(log).context("failed to serialize conversation")?;

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), turns = log.len(), "conversation history saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> ConversationLog {
        let mut log = ConversationLog::new();
        log.push(Turn::user("오늘 기분 어때?"));
        log.push(Turn::assistant("좋아요!"));
        log.push(Turn::user("뉴스 검색해줘"));
        log.push(Turn::assistant("1. [2024-05-01 10:00] 제목\n요약\n🔗 http://a\n\n"));
        log
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConversationStore::new(dir.path().join("conversation.json"));

        let log = sample_log();
        store.try_save(&log).await.expect("save");
        let loaded = store.load().await;

        assert_eq!(loaded, log);
    }

    #[tokio::test]
    async fn file_is_pretty_json_array_with_raw_unicode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conversation.json");
        let store = ConversationStore::new(&path);

        store.save(&sample_log()).await;

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("[\n"));
        assert!(text.contains("\"role\": \"user\""));
        assert!(text.contains("오늘 기분 어때?"));
        assert!(!dir.path().join("conversation.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConversationStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conversation.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(ConversationStore::new(&path).load().await.is_empty());

        std::fs::write(&path, r#"[{"role": "system", "content": "x"}]"#).expect("write");
        assert!(ConversationStore::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConversationStore::new(dir.path().join("nested/deeper/history.json"));
        store.try_save(&sample_log()).await.expect("save");
        assert_eq!(store.load().await.len(), 4);
    }

    #[tokio::test]
    async fn unwritable_target_is_swallowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("taken");
        std::fs::create_dir_all(path.join("child")).expect("mkdir");
        let store = ConversationStore::new(&path);

        assert!(store.try_save(&sample_log()).await.is_err());
        store.save(&sample_log()).await;
    }

    #[test]
    fn recent_is_bounded_from_the_end() {
        let log = sample_log();
        assert_eq!(log.recent(Some(2)), &log.turns()[2..]);
        assert_eq!(log.recent(Some(100)).len(), 4);
        assert_eq!(log.recent(None).len(), 4);
        assert!(log.recent(Some(0)).is_empty());
    }
}
