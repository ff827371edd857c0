use std::fmt;
use std::sync::{Arc, OnceLock};

use sift_llm::ProviderType;
use tiktoken_rs::CoreBPE;

use crate::error::{ContextError, Result};

/// BPE encoding used to meter text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// GPT-2 / r50k_base
    #[default]
    R50k,
    Cl100k,
    O200k,
}

impl Encoding {
    /// Encoding used to meter prompts for a provider.
    /// Anthropic has no local tokenizer, so cl100k stands in for it.
    pub fn for_provider(provider: ProviderType) -> Self {
        match provider {
            ProviderType::Anthropic => Encoding::Cl100k,
            _ => Encoding::R50k,
        }
    }

    fn bpe(self) -> Result<&'static CoreBPE> {
        static R50K: OnceLock<CoreBPE> = OnceLock::new();
        static CL100K: OnceLock<CoreBPE> = OnceLock::new();
        static O200K: OnceLock<CoreBPE> = OnceLock::new();

        let cell = match self {
            Encoding::R50k => &R50K,
            Encoding::Cl100k => &CL100K,
            Encoding::O200k => &O200K,
        };
        if let Some(bpe) = cell.get() {
            return Ok(bpe);
        }

        let bpe = match self {
            Encoding::R50k => tiktoken_rs::r50k_base(),
            Encoding::Cl100k => tiktoken_rs::cl100k_base(),
            Encoding::O200k => tiktoken_rs::o200k_base(),
        }
        .map_err(|e| ContextError::Tokenizer(e.to_string()))?;

        Ok(cell.get_or_init(|| bpe))
    }
}

type CountFn = dyn Fn(&str) -> usize + Send + Sync;

/// Counts tokens in text
///
/// Cheap to clone; the underlying encoder is built once per process.
#[derive(Clone)]
pub struct TokenMeter {
    counter: Arc<CountFn>,
}

impl TokenMeter {
    pub fn new(encoding: Encoding) -> Result<Self> {
        let bpe = encoding.bpe()?;
        Ok(Self {
            counter: Arc::new(move |text: &str| bpe.encode_with_special_tokens(text).len()),
        })
    }

    /// Meter with a custom counting function
    pub fn with_counter<F>(counter: F) -> Self
    where
        F: Fn(&str) -> usize + Send + Sync + 'static,
    {
        Self {
            counter: Arc::new(counter),
        }
    }

    pub fn count(&self, text: &str) -> usize {
        (self.counter)(text)
    }

    pub fn fits(&self, text: &str, limit: usize) -> bool {
        self.count(text) <= limit
    }
}

impl fmt::Debug for TokenMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenMeter").finish_non_exhaustive()
    }
}

/// Rough word count for a token count, at 0.56 words per GPT-2 token.
/// Only used to pick a safe character length for slicing.
pub fn estimate_word_count(tokens: usize) -> usize {
    (tokens * 56).div_ceil(100)
}

/// Accept a computed output budget only when it is positive.
///
/// Budgets above `u32::MAX` are clamped to it; the summary loop never produces
/// one since it caps each round at `max_token_length`.
pub fn validate_positive(max_tokens: i64) -> Result<u32> {
    if max_tokens <= 0 {
        return Err(ContextError::InvalidBudget(max_tokens));
    }
    Ok(u32::try_from(max_tokens).unwrap_or(u32::MAX))
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Byte length of the longest char-aligned prefix of `text` accepted by `fits`.
///
/// `fits` must be monotonic: if a prefix fits, every shorter prefix fits.
/// Returns 0 when not even the empty prefix fits.
pub fn longest_fitting_prefix(text: &str, fits: impl Fn(&str) -> bool) -> usize {
    if fits(text) {
        return text.len();
    }

    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());

    // bounds[lo] always fits (or lo == 0), bounds[hi] never does
    let (mut lo, mut hi) = (0usize, bounds.len() - 1);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if fits(&text[..bounds[mid]]) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    bounds[lo]
}
