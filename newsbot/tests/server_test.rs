use std::sync::Arc;

use anyhow::Result;
use common::Config;
use newsbot::aggregator::NewsAggregator;
use newsbot::conversation::ConversationStore;
use newsbot::ingestion::{FeedEntry, FeedFetcher};
use newsbot::intent::KeywordClassifier;
use newsbot::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use newsbot::server::{build_rocket, AppState};
use newsbot::sessions::ChatSession;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;

struct EchoProvider;

#[async_trait::async_trait]
impl LlmProvider for EchoProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(LlmResponse {
            content: format!("echo: {last}"),
            usage: UsageMetadata::default(),
            model: "echo".to_string(),
        })
    }
}

struct EmptyFetcher;

#[async_trait::async_trait]
impl FeedFetcher for EmptyFetcher {
    async fn fetch_entries(&self, _url: &str) -> Result<Vec<FeedEntry>> {
        Ok(Vec::new())
    }

    async fn fetch_article_text(&self, _url: &str) -> Result<String> {
        Ok(String::new())
    }
}

async fn client(dir: &tempfile::TempDir) -> Client {
    let mut config = Config::default();
    config.storage.history_path = dir.path().join("history.json").to_string_lossy().to_string();

    let session = ChatSession::open(
        ConversationStore::new(&config.storage.history_path),
        Box::new(KeywordClassifier::default()),
        NewsAggregator::new(Arc::new(EmptyFetcher), config.news.clone()),
        Arc::new(EchoProvider),
        &config,
    )
    .await;

    let rocket = build_rocket(AppState::new(session), &config.server);
    Client::tracked(rocket).await.expect("valid rocket instance")
}

#[tokio::test]
async fn test_index_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(&dir).await;

    let index = client.get("/").dispatch().await;
    assert_eq!(index.status(), Status::Ok);
    assert_eq!(index.content_type(), Some(ContentType::HTML));
    let body = index.into_string().await.unwrap_or_default();
    assert!(body.contains("/ws/chat"));

    let health = client.get("/health").dispatch().await;
    assert_eq!(health.into_string().await.as_deref(), Some("OK"));
}

#[tokio::test]
async fn test_chat_endpoint_runs_exchanges() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(&dir).await;

    let chat = client
        .post("/api/v1/chat")
        .header(ContentType::JSON)
        .body(r#"{"message": "오늘 기분 어때?"}"#)
        .dispatch()
        .await;
    assert_eq!(chat.status(), Status::Ok);
    let value: serde_json::Value =
        serde_json::from_str(&chat.into_string().await.unwrap_or_default()).expect("json");
    assert_eq!(value["intent"], "chat");
    assert_eq!(value["reply"], "echo: 오늘 기분 어때?");

    let news = client
        .post("/api/v1/chat")
        .header(ContentType::JSON)
        .body(r#"{"message": "뉴스 검색"}"#)
        .dispatch()
        .await;
    let value: serde_json::Value =
        serde_json::from_str(&news.into_string().await.unwrap_or_default()).expect("json");
    assert_eq!(value["intent"], "news");
    assert_eq!(value["reply"], newsbot::sessions::NO_RESULTS);

    let blank = client
        .post("/api/v1/chat")
        .header(ContentType::JSON)
        .body(r#"{"message": "  "}"#)
        .dispatch()
        .await;
    assert_eq!(blank.status(), Status::NoContent);

    let history = client.get("/api/v1/history").dispatch().await;
    let turns: serde_json::Value =
        serde_json::from_str(&history.into_string().await.unwrap_or_default()).expect("json");
    let turns = turns.as_array().expect("array");
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[1]["content"], "echo: 오늘 기분 어때?");

    let status = client.get("/api/v1/status").dispatch().await;
    let value: serde_json::Value =
        serde_json::from_str(&status.into_string().await.unwrap_or_default()).expect("json");
    assert_eq!(value["turns"], 4);
    assert_eq!(value["news_offset"], 5);
}
