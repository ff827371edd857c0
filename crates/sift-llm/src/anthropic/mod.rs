mod client;

pub use client::{AnthropicClient, API_VERSION, DEFAULT_MAX_OUTPUT_TOKENS};
