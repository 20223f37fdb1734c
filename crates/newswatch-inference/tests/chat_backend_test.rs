//! HTTP-level tests for the OpenAI-compatible chat backend.

use newswatch_core::ChatBackend;
use newswatch_inference::{ChatConfig, OpenAiChatBackend};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> OpenAiChatBackend {
    let config = ChatConfig::openai("test-key".to_string(), "test-model".to_string())
        .with_base_url(server.uri());
    OpenAiChatBackend::new(config).expect("Failed to create backend")
}

#[tokio::test]
async fn test_chat_success() {
    let mock_server = MockServer::start().await;

    let chat_response = serde_json::json!({
        "id": "chatcmpl-123",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "整体情绪偏多。"
            },
            "finish_reason": "stop"
        }]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "temperature": 0.2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&chat_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = backend_for(&mock_server);
    let result = backend.chat("system instruction", "user prompt").await;

    assert!(result.is_ok(), "Request should succeed: {:?}", result.err());
    assert_eq!(result.unwrap(), "整体情绪偏多。");
}

#[tokio::test]
async fn test_chat_sends_system_and_user_messages() {
    let mock_server = MockServer::start().await;

    let chat_response = serde_json::json!({
        "choices": [{
            "message": { "role": "assistant", "content": "ok" }
        }]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&chat_response))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = backend_for(&mock_server);
    let result = backend.chat("be brief", "hello").await;
    assert!(result.is_ok(), "Request should succeed: {:?}", result.err());
}

#[tokio::test]
async fn test_rate_limit_error_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string(r#"{"error": {"message": "Rate limit reached"}}"#),
        )
        .mount(&mock_server)
        .await;

    let backend = backend_for(&mock_server);
    let err = backend.chat("s", "p").await.unwrap_err();

    // The message carries the status code so the executor requeues
    // instead of failing terminally.
    assert!(err.to_string().contains("HTTP 429"), "got: {err}");
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_server_error_is_not_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let backend = backend_for(&mock_server);
    let err = backend.chat("s", "p").await.unwrap_err();
    assert!(err.to_string().contains("HTTP 500"));
    assert!(!err.is_rate_limited());
}

#[tokio::test]
async fn test_malformed_response_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let backend = backend_for(&mock_server);
    assert!(backend.chat("s", "p").await.is_err());
}

#[tokio::test]
async fn test_empty_content_is_an_error() {
    let mock_server = MockServer::start().await;

    let chat_response = serde_json::json!({
        "choices": [{
            "message": { "role": "assistant", "content": "   " }
        }]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&chat_response))
        .mount(&mock_server)
        .await;

    let backend = backend_for(&mock_server);
    assert!(backend.chat("s", "p").await.is_err());
}
