use common::{LlmConfig, TokenParam};
use mockito::Matcher;
use newsbot::llm::remote::{read_api_key, RemoteLlmProvider};
use newsbot::llm::{ChatMessage, LlmProvider, LlmRequest};
use serde_json::json;

const OK_BODY: &str = r#"{
    "model": "gpt-5-nano",
    "choices": [{
        "message": {
            "role": "assistant",
            "content": "  This is a test response\n"
        },
        "finish_reason": "stop"
    }],
    "usage": {
        "prompt_tokens": 10,
        "completion_tokens": 5,
        "total_tokens": 15
    }
}"#;

fn request(max_tokens: Option<usize>, timeout_seconds: Option<u64>) -> LlmRequest {
    LlmRequest {
        messages: vec![
            ChatMessage::system("You are a test"),
            ChatMessage::user("Test prompt"),
        ],
        max_tokens,
        temperature: None,
        timeout_seconds,
    }
}

#[tokio::test]
async fn test_remote_provider_with_mock() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .match_header("authorization", "Bearer fake-api-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-5-nano",
            "messages": [
                {"role": "system", "content": "You are a test"},
                {"role": "user", "content": "Test prompt"}
            ],
            "max_completion_tokens": 100
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(OK_BODY)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "gpt-5-nano");

    let response = provider
        .generate(request(Some(100), Some(10)))
        .await
        .expect("generate");

    assert_eq!(response.content, "This is a test response");
    assert_eq!(response.usage.prompt_tokens, 10);
    assert_eq!(response.usage.completion_tokens, 5);
    assert_eq!(response.usage.total_tokens, 15);
    assert_eq!(response.model, "gpt-5-nano");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_legacy_token_field_and_temperature() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "max_tokens": 64,
            "temperature": 0.5
        })))
        .with_status(200)
        .with_body(OK_BODY)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "k", "local-model")
        .with_defaults(10, 64, Some(0.5))
        .with_token_param(TokenParam::MaxTokens);

    let response = provider.generate(request(None, None)).await.expect("generate");
    assert_eq!(response.content, "This is a test response");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_missing_usage_is_tolerated() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "k", "fallback-model");
    let response = provider.generate(request(None, None)).await.expect("generate");

    assert_eq!(response.content, "hi");
    assert_eq!(response.usage.total_tokens, 0);
    assert_eq!(response.model, "fallback-model");
}

#[tokio::test]
async fn test_remote_provider_error_handling() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": {"message": "Rate limit exceeded"}}"#)
        .expect(1)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "gpt-5-nano");

    let err = provider.generate(request(None, None)).await.unwrap_err();
    assert!(err.to_string().contains("429"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_no_choices() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "k", "m");
    let err = provider.generate(request(None, None)).await.unwrap_err();
    assert!(err.to_string().contains("no choices"));
}

#[tokio::test]
async fn test_remote_provider_timeout() {
    let mut server = mockito::Server::new_async().await;

    // Mock slow response
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(std::time::Duration::from_secs(3));
            w.write_all(b"too late")
        })
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "gpt-5-nano");

    let result = provider.generate(request(None, Some(1))).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("timed out"));
}

#[tokio::test]
async fn test_remote_provider_from_config() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .match_header("authorization", "Bearer from-config")
        .match_body(Matcher::PartialJson(json!({
            "model": "local-model",
            "max_tokens": 32,
            "temperature": 0.25
        })))
        .with_status(200)
        .with_body(OK_BODY)
        .create_async()
        .await;

    let config = LlmConfig {
        api_url: server.url(),
        model: "local-model".to_string(),
        token_param: TokenParam::MaxTokens,
        temperature: Some(0.25),
        ..LlmConfig::default()
    };
    let provider = RemoteLlmProvider::from_config(&config, "from-config");
    assert_eq!(provider.model(), "local-model");

    provider.generate(request(Some(32), None)).await.expect("generate");
    mock.assert_async().await;
}

#[test]
fn test_api_key_is_read_from_environment() {
    std::env::set_var("NEWSBOT_TEST_KEY_SET", "  sk-test  \n");
    assert_eq!(read_api_key("NEWSBOT_TEST_KEY_SET").as_deref(), Some("sk-test"));
}

#[test]
fn test_missing_or_blank_api_key_is_none() {
    std::env::remove_var("NEWSBOT_TEST_KEY_UNSET");
    assert_eq!(read_api_key("NEWSBOT_TEST_KEY_UNSET"), None);

    std::env::set_var("NEWSBOT_TEST_KEY_EMPTY", "");
    assert_eq!(read_api_key("NEWSBOT_TEST_KEY_EMPTY"), None);

    std::env::set_var("NEWSBOT_TEST_KEY_BLANK", " \t ");
    assert_eq!(read_api_key("NEWSBOT_TEST_KEY_BLANK"), None);
}
