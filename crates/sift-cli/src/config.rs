use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use sift_llm::config::{AnthropicConfig, OpenAIConfig, ProviderDetails};
use sift_llm::{ProviderConfig, ProviderType};
use sift_types::{GenerateSettings, ModelPreset};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub summary: GenerateSettings,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Model presets selectable with `--model`
    #[serde(default = "ModelPreset::builtin")]
    pub models: Vec<ModelPreset>,

    // Secrets (from ENV only)
    #[serde(skip)]
    pub openai_api_key: Option<String>,
    #[serde(skip)]
    pub anthropic_api_key: Option<String>,
    #[serde(skip)]
    pub azure_openai_api_key: Option<String>,
    #[serde(skip)]
    pub azure_openai_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
    /// Base URL for OpenAI-compatible gateways
    pub openai_base_url: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub azure_api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_calls: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: sift_llm::rate_limit::DEFAULT_MAX_CALLS,
            window_secs: sift_llm::rate_limit::DEFAULT_WINDOW.as_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "outputs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `path`, when given
    /// 4. Environment variables prefixed `SIFT__`, e.g. `SIFT__SUMMARY__CHUNK_TOKEN_LENGTH`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("SIFT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.load_secrets();
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load secrets from ENV (not in TOML)
    fn load_secrets(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        self.openai_api_key = var("OPENAI_API_KEY");
        self.anthropic_api_key = var("ANTHROPIC_API_KEY");
        self.azure_openai_api_key = var("AZURE_OPENAI_API_KEY");
        self.azure_openai_endpoint = var("AZURE_OPENAI_ENDPOINT");
    }

    /// Replace the summary settings with a named preset's defaults,
    /// keeping the configured query and system role
    pub fn apply_preset(&mut self, name: &str) -> Result<(), ConfigError> {
        let preset = ModelPreset::find(&self.models, name).map_err(|e| ConfigError::Message(e.to_string()))?;
        let settings = GenerateSettings::from_preset(preset)
            .with_query(self.summary.query.clone())
            .with_system_role(self.summary.system_role.clone())
            .with_body_token_ceiling(self.summary.body_token_ceiling)
            .with_overflow_policy(self.summary.overflow_policy)
            .with_condense_strategy(self.summary.condense_strategy)
            .with_duplicate_first_chunk(self.summary.duplicate_first_chunk);
        self.summary = settings;
        Ok(())
    }

    /// Connection details for the provider selected by `summary.model_type`
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        fn required(value: &Option<String>, name: &str) -> Result<String, ConfigError> {
            value
                .clone()
                .ok_or_else(|| ConfigError::Message(format!("{} environment variable is required", name)))
        }

        let details = match self.summary.model_type {
            ProviderType::OpenAI => {
                let mut openai = OpenAIConfig::new(required(&self.openai_api_key, "OPENAI_API_KEY")?);
                if let Some(base_url) = &self.llm.openai_base_url {
                    openai = openai.with_base_url(base_url.clone());
                }
                ProviderDetails::OpenAI(openai)
            }
            ProviderType::AzureOpenAI => {
                return Ok(ProviderConfig::azure_openai(
                    required(&self.azure_openai_api_key, "AZURE_OPENAI_API_KEY")?,
                    required(&self.azure_openai_endpoint, "AZURE_OPENAI_ENDPOINT")?,
                    required(&self.llm.azure_api_version, "azure_api_version")?,
                ));
            }
            ProviderType::Anthropic => ProviderDetails::Anthropic(AnthropicConfig {
                api_key: required(&self.anthropic_api_key, "ANTHROPIC_API_KEY")?,
                base_url: self.llm.anthropic_base_url.clone(),
            }),
        };

        Ok(ProviderConfig { details })
    }
}
