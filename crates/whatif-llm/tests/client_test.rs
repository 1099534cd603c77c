use mockito::Matcher;
use serde_json::json;
use whatif_llm::{AnthropicClient, ChatClient, ChatOptions, ChatRequest, Message, OpenAIClient};

fn request() -> ChatRequest {
    ChatRequest::new(
        "test-model",
        vec![
            Message::system("Return JSON only"),
            Message::human("Generate a timeline for: Marie Curie"),
        ],
    )
    .with_options(ChatOptions::new().max_tokens(4096))
}

#[tokio::test]
async fn test_anthropic_chat_sends_system_separately() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/messages")
        .match_header("x-api-key", "secret")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({
            "model": "test-model",
            "max_tokens": 4096,
            "system": "Return JSON only",
            "messages": [{"role": "user", "content": "Generate a timeline for: Marie Curie"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "test-model",
                "content": [{"type": "text", "text": "{\"person\":\"Marie Curie\"}"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 8}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = AnthropicClient::new("secret").unwrap().with_base_url(server.url());
    let response = client.chat(request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content.as_deref(), Some("{\"person\":\"Marie Curie\"}"));
    assert_eq!(response.usage.unwrap().total_tokens, 20);
    assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
}

#[tokio::test]
async fn test_anthropic_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/messages")
        .with_status(529)
        .with_body("overloaded")
        .create_async()
        .await;

    let client = AnthropicClient::new("secret").unwrap().with_base_url(server.url());
    let err = client.chat(request()).await.unwrap_err();

    assert!(err.to_string().contains("Anthropic API error"));
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::PartialJson(json!({"model": "test-model", "max_tokens": 4096})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 0,
                "model": "test-model",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "hello"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OpenAIClient::new("secret").unwrap().with_base_url(server.url());
    let response = client.chat(request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content.as_deref(), Some("hello"));
    assert_eq!(response.usage.unwrap().total_tokens, 4);
}
