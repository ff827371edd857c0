// OpenAI-specific client implementation

use crate::traits::{openai_chat_payload, ChatClient, ChatRequest, ChatResponse, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

pub(crate) const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI client (HTTP direct, no SDK)
///
/// Also usable against OpenAI-compatible gateways through [`OpenAIClient::with_base_url`].
#[derive(Debug)]
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAIClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = openai_chat_payload(Some(&request.model), &request.messages, &request.options);

        tracing::debug!(model = %request.model, "sending OpenAI chat completion");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let raw: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        Ok(raw.into_chat_response())
    }
}

// ============================================================================
// OPENAI-COMPATIBLE RESPONSE TYPES (shared with Azure OpenAI)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OpenAIChatResponse {
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl OpenAIChatResponse {
    /// Convert to provider-agnostic response
    pub(crate) fn into_chat_response(self) -> ChatResponse {
        let choice = self.choices.first();
        ChatResponse {
            content: choice.and_then(|c| c.message.content.clone()),
            usage: self.usage.as_ref().map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_override_strips_slash() {
        let client = OpenAIClient::new("test-key")
            .unwrap()
            .with_base_url("http://localhost:4000/v1/");
        assert_eq!(client.base_url(), "http://localhost:4000/v1");
    }

    #[test]
    fn test_response_conversion() {
        let raw: OpenAIChatResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "A summary."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }))
        .unwrap();

        let response = raw.into_chat_response();
        assert_eq!(response.content.as_deref(), Some("A summary."));
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 13);
    }

    #[test]
    fn test_response_without_choices() {
        let raw: OpenAIChatResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-2",
            "choices": [],
        }))
        .unwrap();

        let response = raw.into_chat_response();
        assert!(response.content.is_none());
        assert!(response.usage.is_none());
    }
}
