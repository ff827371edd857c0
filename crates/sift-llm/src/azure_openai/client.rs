// Azure OpenAI-specific client implementation

use crate::openai::OpenAIChatResponse;
use crate::traits::{openai_chat_payload, ChatClient, ChatRequest, ChatResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

/// Azure OpenAI client (HTTP direct, no SDK)
///
/// Azure OpenAI uses a different endpoint structure and authentication method than OpenAI:
/// - URL: https://{resource}.openai.azure.com/openai/deployments/{deployment}/...
/// - Auth header: api-key instead of Authorization: Bearer
/// - Deployment name is passed via the model parameter in each request
#[derive(Debug)]
pub struct AzureOpenAIClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_version: String,
}

impl AzureOpenAIClient {
    /// Create new Azure OpenAI client with builder pattern
    pub fn builder() -> AzureOpenAIClientBuilder {
        AzureOpenAIClientBuilder::default()
    }

    /// Build the full URL for an Azure OpenAI endpoint
    /// The deployment_name comes from the model parameter in the request
    pub fn build_url(&self, deployment_name: &str, path: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, deployment_name, path, self.api_version
        )
    }

    /// Chat completions URL for the deployment named by `request.model`
    pub fn chat_url(&self, request: &ChatRequest) -> String {
        self.build_url(&request.model, "chat/completions")
    }
}

/// Builder for AzureOpenAIClient
#[derive(Default)]
pub struct AzureOpenAIClientBuilder {
    api_key: Option<String>,
    endpoint: Option<String>,
    api_version: Option<String>,
}

impl AzureOpenAIClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the Azure OpenAI endpoint (base URL)
    /// Example: "https://my-resource.openai.azure.com"
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn build(self) -> Result<AzureOpenAIClient> {
        let api_key = self.api_key.context("API key is required")?;
        let endpoint = self.endpoint.context("Endpoint is required")?;
        let api_version = self.api_version.context("API version is required")?;

        let endpoint = endpoint.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "api-key",
            HeaderValue::from_str(&api_key).context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(AzureOpenAIClient {
            http_client,
            endpoint,
            api_version,
        })
    }
}

#[async_trait]
impl ChatClient for AzureOpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        // Deployment is addressed in the URL; the body carries no model field
        let payload = openai_chat_payload(None, &request.messages, &request.options);
        let url = self.chat_url(&request);

        tracing::debug!(deployment = %request.model, "sending Azure OpenAI chat completion");

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Azure OpenAI API error ({}): {}", status, error_text);
        }

        let raw: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        Ok(raw.into_chat_response())
    }
}
