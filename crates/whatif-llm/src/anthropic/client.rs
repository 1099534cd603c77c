// Anthropic Messages API client

use crate::traits::{ChatClient, ChatRequest, ChatResponse, TokenUsage};
use crate::types::Message;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The Messages API requires max_tokens on every request
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic client (HTTP direct, no SDK)
pub struct AnthropicClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AnthropicClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key).context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: ANTHROPIC_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// System messages travel in the top-level `system` field; everything
    /// else goes in `messages`.
    fn build_request(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| !matches!(m, Message::System { .. }))
            .map(|m| {
                serde_json::json!({
                    "role": m.role(),
                    "content": m.content().to_text(),
                })
            })
            .collect();

        let mut payload = serde_json::json!({
            "model": request.model,
            "max_tokens": request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
        });

        if let Some(obj) = payload.as_object_mut() {
            if let Some(system) = request.system_prompt() {
                obj.insert("system".to_string(), serde_json::json!(system));
            }
            if let Some(temp) = request.options.temperature {
                obj.insert("temperature".to_string(), serde_json::json!(temp));
            }
        }

        payload
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_request(&request);

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error ({}): {}", status, error_text);
        }

        let raw: AnthropicMessageResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        // only text blocks are requested; anything else means the contract broke
        let text: Vec<&str> = raw
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if text.is_empty() {
            anyhow::bail!("Unexpected response type from Anthropic");
        }

        tracing::debug!(model = %raw.model, output_tokens = raw.usage.output_tokens, "Anthropic chat completed");

        Ok(ChatResponse {
            content: Some(text.concat()),
            usage: Some(TokenUsage {
                input_tokens: raw.usage.input_tokens,
                output_tokens: raw.usage.output_tokens,
                total_tokens: raw.usage.input_tokens + raw.usage.output_tokens,
            }),
            finish_reason: raw.stop_reason.clone(),
            raw: serde_json::to_value(&raw)?,
        })
    }
}

// ============================================================================
// ANTHROPIC-SPECIFIC RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicMessageResponse {
    pub id: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
