// Anthropic Messages API client implementation

use crate::traits::{ChatClient, ChatRequest, ChatResponse, TokenUsage};
use crate::types::Message;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; used when the request leaves it unset
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Anthropic client (HTTP direct, no SDK)
///
/// Auth goes through `x-api-key`, and the system prompt travels as a top-level
/// `system` field rather than as a message.
#[derive(Debug)]
pub struct AnthropicClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let headers = build_headers(&api_key.into())?;

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: ANTHROPIC_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build messages request payload
    fn build_request(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| !matches!(m, Message::System { .. }))
            .map(|m| {
                serde_json::json!({
                    "role": m.role(),
                    "content": m.content(),
                })
            })
            .collect();

        let mut payload = serde_json::json!({
            "model": request.model,
            "max_tokens": request.options.max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
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

fn build_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
    headers.insert(
        "x-api-key",
        HeaderValue::from_str(api_key).context("Invalid API key format")?,
    );
    Ok(headers)
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_request(&request);

        tracing::debug!(model = %request.model, "sending Anthropic message");

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error ({}): {}", status, error_text);
        }

        let raw: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        Ok(raw.into_chat_response())
    }
}

// ============================================================================
// ANTHROPIC-SPECIFIC RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicResponse {
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AnthropicResponse {
    fn into_chat_response(self) -> ChatResponse {
        // First text block carries the answer
        let content = self
            .content
            .iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text.clone());

        ChatResponse {
            content,
            usage: self.usage.as_ref().map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            finish_reason: self.stop_reason.clone(),
        }
    }
}
