pub mod types;
pub mod traits;
pub mod config;
pub mod rate_limit;
pub mod openai;
pub mod azure_openai;
pub mod anthropic;

pub use traits::{
    ChatClient,
    ChatRequest, ChatResponse, ChatOptions,
    TokenUsage,
};

pub use config::{ClientFactory, ProviderConfig, ProviderType};
pub use rate_limit::RateLimiter;
pub use openai::OpenAIClient;
pub use azure_openai::AzureOpenAIClient;
pub use anthropic::AnthropicClient;
pub use types::Message;
