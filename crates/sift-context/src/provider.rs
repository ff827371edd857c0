use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sift_llm::{ChatClient, ChatOptions, ChatRequest, ClientFactory, Message, ProviderConfig, ProviderType, RateLimiter};
use sift_types::GenerateSettings;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::error::ContextError;
use crate::tokens::validate_positive;

/// Text completion backend used by the summary loop
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32, settings: &GenerateSettings) -> Result<String>;
}

#[async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for Arc<P> {
    async fn complete(&self, prompt: &str, max_tokens: u32, settings: &GenerateSettings) -> Result<String> {
        (**self).complete(prompt, max_tokens, settings).await
    }
}

/// Validate the budget, then ask the provider for a completion.
/// An invalid budget never reaches the provider.
pub async fn complete_text(
    provider: &dyn CompletionProvider,
    prompt: &str,
    max_tokens: i64,
    settings: &GenerateSettings,
) -> crate::Result<String> {
    let max_tokens = validate_positive(max_tokens)?;
    provider
        .complete(prompt, max_tokens, settings)
        .await
        .map_err(ContextError::Completion)
}

/// Routes completions to a chat client chosen by `settings.model_type`
#[derive(Clone, Default)]
pub struct LlmProvider {
    clients: HashMap<ProviderType, Arc<dyn ChatClient>>,
}

impl LlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, provider: ProviderType, client: Arc<dyn ChatClient>) -> Self {
        self.clients.insert(provider, client);
        self
    }

    /// Build the client described by `config` and register it under its provider type
    pub fn from_config(config: ProviderConfig) -> Result<Self> {
        let provider = config.provider_type();
        let client = ClientFactory::create_client(config)?;
        Ok(Self::new().with_client(provider, client))
    }
}

#[async_trait]
impl CompletionProvider for LlmProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32, settings: &GenerateSettings) -> Result<String> {
        let client = self
            .clients
            .get(&settings.model_type)
            .ok_or_else(|| anyhow!("No client configured for provider: {}", settings.model_type))?;

        let request = ChatRequest::new(
            settings.selected_model.clone(),
            vec![
                Message::system(settings.system_role.clone()),
                Message::human(prompt),
            ],
        )
        .with_options(
            ChatOptions::new()
                .max_tokens(max_tokens)
                .temperature(settings.temperature),
        );

        let response = client.chat(request).await?;
        if let Some(usage) = response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                total_tokens = usage.total_tokens,
                "Token usage"
            );
        }
        if response.hit_token_limit() {
            warn!(max_tokens, model = %settings.selected_model, "Completion cut off at the output budget");
        }

        let content = response
            .content
            .ok_or_else(|| anyhow!("No completion choices returned by {}", settings.model_type))?;

        Ok(content.trim().to_string())
    }
}

/// Claims a rate-limiter slot before each completion
pub struct RateLimited<P> {
    inner: P,
    limiter: Arc<RateLimiter>,
}

impl<P> RateLimited<P> {
    pub fn new(inner: P, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for RateLimited<P> {
    async fn complete(&self, prompt: &str, max_tokens: u32, settings: &GenerateSettings) -> Result<String> {
        self.limiter.acquire().await;
        self.inner.complete(prompt, max_tokens, settings).await
    }
}

/// Wraps each completion in a tracing span and logs its outcome
pub struct Logged<P> {
    inner: P,
}

impl<P> Logged<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for Logged<P> {
    async fn complete(&self, prompt: &str, max_tokens: u32, settings: &GenerateSettings) -> Result<String> {
        let span = info_span!(
            "complete_text",
            provider = %settings.model_type,
            model = %settings.selected_model,
            max_tokens
        );

        async {
            let started = Instant::now();
            let result = self.inner.complete(prompt, max_tokens, settings).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(text) => debug!(elapsed_ms, output_chars = text.len(), "Completion finished"),
                Err(e) => error!(elapsed_ms, "Error completing text: {}", e),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_llm::{ChatResponse, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingClient {
        requests: Mutex<Vec<ChatRequest>>,
        content: Option<String>,
        finish_reason: &'static str,
    }

    impl RecordingClient {
        fn new(content: Option<&str>) -> Arc<Self> {
            Self::finishing(content, "stop")
        }

        fn finishing(content: Option<&str>, finish_reason: &'static str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                content: content.map(str::to_string),
                finish_reason,
            })
        }
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(ChatResponse {
                content: self.content.clone(),
                usage: Some(TokenUsage {
                    input_tokens: 12,
                    output_tokens: 3,
                    total_tokens: 15,
                }),
                finish_reason: Some(self.finish_reason.to_string()),
            })
        }
    }

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionProvider for CountingProvider {
        async fn complete(&self, _prompt: &str, max_tokens: u32, _settings: &GenerateSettings) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("ok {}", max_tokens))
        }
    }

    #[tokio::test]
    async fn test_llm_provider_sends_system_role_and_prompt() {
        let client = RecordingClient::new(Some("  summary  "));
        let provider = LlmProvider::new().with_client(ProviderType::OpenAI, client.clone());
        let settings = GenerateSettings::new("gpt-4o-mini", ProviderType::OpenAI)
            .with_system_role("Be brief.")
            .with_temperature(0.5);

        let text = provider.complete("Summarize this", 128, &settings).await.unwrap();
        assert_eq!(text, "summary");

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[0].system_prompt(), Some("Be brief."));
        assert_eq!(requests[0].messages[1].content(), "Summarize this");
        assert_eq!(requests[0].options.max_tokens, Some(128));
        assert_eq!(requests[0].options.temperature, Some(0.5));
    }

    #[tokio::test]
    async fn test_llm_provider_keeps_text_cut_off_at_budget() {
        let client = RecordingClient::finishing(Some("partial summ"), "length");
        let provider = LlmProvider::new().with_client(ProviderType::OpenAI, client);
        let settings = GenerateSettings::new("gpt-4o-mini", ProviderType::OpenAI);

        let text = provider.complete("p", 4, &settings).await.unwrap();
        assert_eq!(text, "partial summ");
    }

    #[tokio::test]
    async fn test_llm_provider_routes_by_model_type() {
        let openai = RecordingClient::new(Some("openai"));
        let anthropic = RecordingClient::new(Some("anthropic"));
        let provider = LlmProvider::new()
            .with_client(ProviderType::OpenAI, openai.clone())
            .with_client(ProviderType::Anthropic, anthropic.clone());

        let settings = GenerateSettings::new("claude-3-haiku-20240307", ProviderType::Anthropic);
        assert_eq!(provider.complete("p", 10, &settings).await.unwrap(), "anthropic");
        assert!(openai.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_llm_provider_errors() {
        let provider = LlmProvider::new().with_client(ProviderType::OpenAI, RecordingClient::new(None));

        let settings = GenerateSettings::new("gpt-4o-mini", ProviderType::OpenAI);
        let err = provider.complete("p", 10, &settings).await.unwrap_err();
        assert!(err.to_string().contains("No completion choices"));

        let settings = GenerateSettings::new("claude", ProviderType::Anthropic);
        let err = provider.complete("p", 10, &settings).await.unwrap_err();
        assert!(err.to_string().contains("No client configured for provider: anthropic"));
    }

    #[tokio::test]
    async fn test_invalid_budget_never_reaches_provider() {
        let provider = CountingProvider { calls: AtomicUsize::new(0) };
        let settings = GenerateSettings::default();

        let result = complete_text(&provider, "p", 0, &settings).await;
        assert!(matches!(result, Err(ContextError::InvalidBudget(0))));
        let result = complete_text(&provider, "p", -12, &settings).await;
        assert!(matches!(result, Err(ContextError::InvalidBudget(-12))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let text = complete_text(&provider, "p", 42, &settings).await.unwrap();
        assert_eq!(text, "ok 42");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_waits_for_window() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));
        let provider = Logged::new(RateLimited::new(
            CountingProvider { calls: AtomicUsize::new(0) },
            limiter,
        ));
        let settings = GenerateSettings::default();

        let start = tokio::time::Instant::now();
        for _ in 0..3 {
            provider.complete("p", 1, &settings).await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_secs(60));
    }
}
