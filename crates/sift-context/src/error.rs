use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Invalid max_tokens value: {0}. It must be greater than 0.")]
    InvalidBudget(i64),

    #[error("{0}")]
    Completion(anyhow::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error(transparent)]
    Settings(#[from] sift_types::SettingsError),
}

pub type Result<T> = std::result::Result<T, ContextError>;
