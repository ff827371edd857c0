use serde::{Deserialize, Serialize};
use sift_llm::ProviderType;
use thiserror::Error;

pub const DEFAULT_CHUNK_TOKEN_LENGTH: usize = 2000;
pub const DEFAULT_NUMBER_OF_SUMMARIES: usize = 3;
pub const DEFAULT_MAX_TOKEN_LENGTH: u32 = 4096;
pub const DEFAULT_MAX_CONTEXT_LENGTH: usize = 16_385;
/// Token ceiling for a condensed body or carried-over summary
pub const DEFAULT_BODY_TOKEN_CEILING: u32 = 500;
/// Sampling temperature sent with every completion
pub const DEFAULT_TEMPERATURE: f32 = 0.9;
pub const DEFAULT_SYSTEM_ROLE: &str = "You are a helpful assistant.";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const DEFAULT_QUERY_BODY: &str = "Revise and improve the article by incorporating relevant \
information from the comments. Ensure the content is clear, engaging, and easy to understand \
for a general audience. Avoid technical language, present facts objectively, and summarize key \
comments from Reddit. Ensure that the overall sentiment expressed in the comments is accurately \
reflected. Optimize for highly original content. Don't be misled by joke comments. Ensure it's \
written professionally, in a way that is appropriate for the situation. Format the document \
using markdown and include links from the original article/Reddit thread.";

/// Default instruction text, stamped with today's date
pub fn default_query() -> String {
    format!(
        "(Today's Date: {}) {}",
        chrono::Local::now().format("%Y-%b-%d"),
        DEFAULT_QUERY_BODY
    )
}

/// What the chunk packer does with a fragment that pushes a chunk over its bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Measure after appending: the overflowing fragment stays in the chunk it overflowed
    #[default]
    Greedy,
    /// Measure before appending: close the chunk first, split fragments that cannot fit alone
    Strict,
}

/// How over-long text is condensed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CondenseStrategy {
    /// One completion call asking for a shorter version
    #[default]
    Single,
    /// Summarize fixed-size pieces in sequence, repeating on the result while it is too long
    Recursive { piece_chars: usize, max_depth: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("selected model must not be empty")]
    EmptyModel,

    #[error("unknown model preset: {0}")]
    UnknownPreset(String),
}

/// Per-request generation settings
///
/// Built once per request and passed by reference to every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateSettings {
    /// Instruction text placed at the top of every round prompt
    pub query: String,
    pub system_role: String,
    pub chunk_token_length: usize,
    pub max_number_of_summaries: usize,
    /// Max output tokens per round
    pub max_token_length: u32,
    /// Hard ceiling for prompt plus output tokens
    pub max_context_length: usize,
    pub selected_model: String,
    pub model_type: ProviderType,
    pub temperature: f32,
    pub body_token_ceiling: u32,
    pub overflow_policy: OverflowPolicy,
    pub condense_strategy: CondenseStrategy,
    /// Feed the first chunk to two rounds. Kept for parity with earlier output;
    /// whether it improves summaries is unverified.
    pub duplicate_first_chunk: bool,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self {
            query: default_query(),
            system_role: DEFAULT_SYSTEM_ROLE.to_string(),
            chunk_token_length: DEFAULT_CHUNK_TOKEN_LENGTH,
            max_number_of_summaries: DEFAULT_NUMBER_OF_SUMMARIES,
            max_token_length: DEFAULT_MAX_TOKEN_LENGTH,
            max_context_length: DEFAULT_MAX_CONTEXT_LENGTH,
            selected_model: DEFAULT_MODEL.to_string(),
            model_type: ProviderType::OpenAI,
            temperature: DEFAULT_TEMPERATURE,
            body_token_ceiling: DEFAULT_BODY_TOKEN_CEILING,
            overflow_policy: OverflowPolicy::default(),
            condense_strategy: CondenseStrategy::default(),
            duplicate_first_chunk: true,
        }
    }
}

impl GenerateSettings {
    pub fn new(model: impl Into<String>, model_type: ProviderType) -> Self {
        Self {
            selected_model: model.into(),
            model_type,
            ..Self::default()
        }
    }

    /// Start from a model preset's defaults
    pub fn from_preset(preset: &ModelPreset) -> Self {
        Self {
            chunk_token_length: preset.default_chunk_token_length,
            max_number_of_summaries: preset.default_number_of_summaries,
            max_token_length: preset.max_token_length,
            max_context_length: preset.max_context_length,
            ..Self::new(preset.id.clone(), preset.provider)
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_system_role(mut self, role: impl Into<String>) -> Self {
        self.system_role = role.into();
        self
    }

    pub fn with_chunk_token_length(mut self, tokens: usize) -> Self {
        self.chunk_token_length = tokens;
        self
    }

    pub fn with_max_number_of_summaries(mut self, rounds: usize) -> Self {
        self.max_number_of_summaries = rounds;
        self
    }

    pub fn with_max_token_length(mut self, tokens: u32) -> Self {
        self.max_token_length = tokens;
        self
    }

    pub fn with_max_context_length(mut self, tokens: usize) -> Self {
        self.max_context_length = tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_body_token_ceiling(mut self, tokens: u32) -> Self {
        self.body_token_ceiling = tokens;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_condense_strategy(mut self, strategy: CondenseStrategy) -> Self {
        self.condense_strategy = strategy;
        self
    }

    pub fn with_duplicate_first_chunk(mut self, enabled: bool) -> Self {
        self.duplicate_first_chunk = enabled;
        self
    }

    /// Reject settings no run can succeed with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.selected_model.trim().is_empty() {
            return Err(SettingsError::EmptyModel);
        }
        if self.chunk_token_length == 0 {
            return Err(SettingsError::Zero("chunk_token_length"));
        }
        if self.max_number_of_summaries == 0 {
            return Err(SettingsError::Zero("max_number_of_summaries"));
        }
        if self.max_token_length == 0 {
            return Err(SettingsError::Zero("max_token_length"));
        }
        if self.max_context_length == 0 {
            return Err(SettingsError::Zero("max_context_length"));
        }
        if self.body_token_ceiling == 0 {
            return Err(SettingsError::Zero("body_token_ceiling"));
        }
        if let CondenseStrategy::Recursive { piece_chars, .. } = self.condense_strategy {
            if piece_chars == 0 {
                return Err(SettingsError::Zero("piece_chars"));
            }
        }
        Ok(())
    }
}

/// Named model with its token limits and generation defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPreset {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub provider: ProviderType,
    pub default_chunk_token_length: usize,
    pub default_number_of_summaries: usize,
    pub max_token_length: u32,
    pub max_context_length: usize,
}

impl ModelPreset {
    /// Built-in presets, used when the config lists none
    pub fn builtin() -> Vec<ModelPreset> {
        vec![
            ModelPreset {
                name: "GPT-4o mini".to_string(),
                id: "gpt-4o-mini".to_string(),
                provider: ProviderType::OpenAI,
                default_chunk_token_length: 2000,
                default_number_of_summaries: 3,
                max_token_length: 4096,
                max_context_length: 128_000,
            },
            ModelPreset {
                name: "GPT-4o".to_string(),
                id: "gpt-4o".to_string(),
                provider: ProviderType::OpenAI,
                default_chunk_token_length: 4000,
                default_number_of_summaries: 3,
                max_token_length: 4096,
                max_context_length: 128_000,
            },
            ModelPreset {
                name: "Claude 3 Haiku".to_string(),
                id: "claude-3-haiku-20240307".to_string(),
                provider: ProviderType::Anthropic,
                default_chunk_token_length: 4000,
                default_number_of_summaries: 3,
                max_token_length: 4096,
                max_context_length: 200_000,
            },
        ]
    }

    /// Find a preset by display name or model id
    pub fn find<'a>(presets: &'a [ModelPreset], name: &str) -> Result<&'a ModelPreset, SettingsError> {
        presets
            .iter()
            .find(|p| p.name == name || p.id == name)
            .ok_or_else(|| SettingsError::UnknownPreset(name.to_string()))
    }
}
