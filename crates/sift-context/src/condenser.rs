use sift_types::{CondenseStrategy, GenerateSettings};
use tracing::{debug, warn};

use crate::error::Result;
use crate::provider::{complete_text, CompletionProvider};
use crate::tokens::{estimate_word_count, truncate_chars, TokenMeter};

/// Shortens text to roughly a target token count through completion calls
pub struct Condenser<'a> {
    provider: &'a dyn CompletionProvider,
    meter: &'a TokenMeter,
    settings: &'a GenerateSettings,
}

impl<'a> Condenser<'a> {
    pub fn new(provider: &'a dyn CompletionProvider, meter: &'a TokenMeter, settings: &'a GenerateSettings) -> Self {
        Self {
            provider,
            meter,
            settings,
        }
    }

    /// Condense `text` with the configured strategy
    pub async fn condense(&self, text: &str, target_tokens: u32) -> Result<String> {
        match self.settings.condense_strategy {
            CondenseStrategy::Single => self.condense_once(text, target_tokens).await,
            CondenseStrategy::Recursive { piece_chars, max_depth } => {
                self.condense_recursive(text, target_tokens, piece_chars, max_depth)
                    .await
            }
        }
    }

    /// Like [`Condenser::condense`], but falls back to a character-truncated
    /// prefix of `text` when condensing fails
    pub async fn condense_or_truncate(&self, text: &str, target_tokens: u32) -> String {
        match self.condense(text, target_tokens).await {
            Ok(condensed) => condensed,
            Err(e) => {
                warn!(error = %e, target_tokens, "Condensing failed, truncating instead");
                truncate_chars(text, estimate_word_count(target_tokens as usize)).to_string()
            }
        }
    }

    async fn condense_once(&self, text: &str, target_tokens: u32) -> Result<String> {
        let prompt = format!(
            "shorten this text to ~{} GPT tokens through summarization: {}",
            target_tokens, text
        );
        complete_text(self.provider, &prompt, target_tokens as i64, self.settings).await
    }

    async fn condense_recursive(
        &self,
        text: &str,
        target_tokens: u32,
        piece_chars: usize,
        max_depth: usize,
    ) -> Result<String> {
        let mut current = text.to_string();
        let mut depth = 0;

        loop {
            depth += 1;
            let result = self.summarize_pieces(&current, target_tokens, piece_chars).await?;
            let tokens = self.meter.count(&result);

            if tokens <= target_tokens as usize {
                return Ok(result);
            }
            if depth >= max_depth.max(1) {
                warn!(tokens, target_tokens, depth, "Condensed text still over target");
                return Ok(result);
            }
            debug!(tokens, target_tokens, depth, "Condensed text over target, running another pass");
            current = result;
        }
    }

    /// One pass: summarize each piece in order, carrying the previous summary as prefix
    async fn summarize_pieces(&self, text: &str, target_tokens: u32, piece_chars: usize) -> Result<String> {
        let words = estimate_word_count(target_tokens as usize);
        let mut summary = String::new();
        let mut result = String::new();

        for piece in char_pieces(text, piece_chars) {
            let prompt = format!(
                "```{summary}```\n\nnew text:\n\n```{piece}```\n\nsummarize then append to last text, \
                 write close to {words} words, use extractive summarization if you have too much text, \
                 use abstractive summarization (no gibberish) if you don't have enough:\n\n```"
            );
            let room = self.settings.max_context_length as i64 - self.meter.count(&prompt) as i64;
            let max_tokens = room.min(target_tokens as i64);

            summary = complete_text(self.provider, &prompt, max_tokens, self.settings).await?;
            result.push_str(&summary);
        }
        Ok(result)
    }
}

/// Split `text` into consecutive pieces of at most `size` characters
fn char_pieces(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut pieces = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let head = truncate_chars(rest, size);
        pieces.push(head);
        rest = &rest[head.len()..];
    }
    pieces
}
