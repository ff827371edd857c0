use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use sift_types::{format_report, Fragment, GenerateSettings, Progress, SummaryRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::condenser::Condenser;
use crate::error::Result;
use crate::packer::ChunkPacker;
use crate::prompt::fit_to_budget;
use crate::provider::{complete_text, CompletionProvider};
use crate::tokens::{estimate_word_count, TokenMeter};

/// Chunk used when a thread has no comments
pub const NO_COMMENTS: &str = "No Comments";
/// Body used when a thread has no selftext
pub const NO_SELFTEXT: &str = "No selftext";

/// Receives a [`Progress`] event after every round
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// A thread ready to be summarized
#[derive(Debug, Clone, Default)]
pub struct ThreadInput {
    pub title: String,
    pub selftext: String,
    pub subreddit: String,
    pub fragments: Vec<Fragment>,
}

/// Drives the multi-round summary: each round summarizes one chunk with the
/// previous round's output as context.
pub struct SummaryLoop<P> {
    provider: P,
    meter: TokenMeter,
    settings: Arc<GenerateSettings>,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl<P: CompletionProvider> SummaryLoop<P> {
    pub fn new(provider: P, meter: TokenMeter, settings: Arc<GenerateSettings>) -> Self {
        Self {
            provider,
            meter,
            settings,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Stop before the next round once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Pack fragments into the chunks fed to each round, at most
    /// `max_number_of_summaries` of them
    pub fn prepare_chunks(&self, fragments: &[Fragment]) -> Vec<String> {
        let packer = ChunkPacker::new(self.meter.clone(), self.settings.overflow_policy);
        let mut chunks = packer.pack(
            fragments.iter().map(|f| f.text.as_str()),
            self.settings.chunk_token_length,
        );

        if chunks.is_empty() {
            chunks.push(NO_COMMENTS.to_string());
        } else if self.settings.duplicate_first_chunk {
            chunks.insert(0, chunks[0].clone());
        }

        chunks.truncate(self.settings.max_number_of_summaries);
        chunks
    }

    /// Title plus selftext, with the selftext condensed when it is long
    pub async fn initial_context(&self, title: &str, selftext: &str) -> String {
        let selftext = if selftext.is_empty() { NO_SELFTEXT } else { selftext };

        if selftext.chars().count() > estimate_word_count(self.settings.max_token_length as usize) {
            debug!(chars = selftext.chars().count(), "Condensing long selftext");
            let condensed = self
                .condenser()
                .condense_or_truncate(selftext, self.settings.body_token_ceiling)
                .await;
            format!("{}\n{}", title, condensed)
        } else {
            format!("{}\n{}", title, selftext)
        }
    }

    /// Summarize a whole thread
    pub async fn run(&self, input: &ThreadInput) -> Result<SummaryRecord> {
        self.settings.validate()?;

        let chunks = self.prepare_chunks(&input.fragments);
        info!(
            fragments = input.fragments.len(),
            rounds = chunks.len(),
            model = %self.settings.selected_model,
            "Generating summaries"
        );

        let context = self.initial_context(&input.title, &input.selftext).await;
        let (prompts, outputs) = self.summarize(context, &chunks, &input.subreddit).await;
        let report = format_report(&prompts, &outputs);

        Ok(SummaryRecord {
            title: input.title.clone(),
            selftext: input.selftext.clone(),
            subreddit: input.subreddit.clone(),
            prompts,
            outputs,
            chunks,
            report,
        })
    }

    /// Run one round per chunk, carrying each output into the next round.
    ///
    /// Per-round failures are recorded inline in that round's output.
    pub async fn summarize(
        &self,
        initial_context: String,
        chunks: &[String],
        subreddit: &str,
    ) -> (Vec<String>, Vec<String>) {
        let settings = self.settings.as_ref();
        let rounds = chunks.len();
        let mut prompts = Vec::with_capacity(rounds);
        let mut outputs = Vec::with_capacity(rounds);
        let mut context = initial_context;

        for (i, chunk) in chunks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(completed = i, rounds, "Summary cancelled");
                break;
            }

            let title_context = if i == 0 {
                context.clone()
            } else {
                self.condenser()
                    .condense_or_truncate(&context, settings.body_token_ceiling)
                    .await
            };

            let prompt = fit_to_budget(
                &self.meter,
                chunk,
                &title_context,
                settings,
                subreddit,
                settings.max_context_length,
            );

            let room = settings.max_context_length as i64 - self.meter.count(&prompt) as i64;
            let max_tokens = room.min(settings.max_token_length as i64);

            let output = match complete_text(&self.provider, &prompt, max_tokens, settings).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(round = i + 1, error = %e, "Round failed");
                    format!("Error completing text: {}", e)
                }
            };

            self.report_progress(&Progress::new(i + 1, rounds, prompt.clone(), output.clone()));

            prompts.push(prompt);
            context = output.clone();
            outputs.push(output);
        }

        (prompts, outputs)
    }

    fn condenser(&self) -> Condenser<'_> {
        Condenser::new(&self.provider, &self.meter, &self.settings)
    }

    fn report_progress(&self, progress: &Progress) {
        let Some(callback) = &self.progress else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| callback(progress))).is_err() {
            warn!(round = progress.round, "Progress callback panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sift_types::OverflowPolicy;
    use std::sync::Mutex;

    struct Echo {
        calls: Mutex<Vec<(String, u32)>>,
    }

    impl Echo {
        fn new() -> Self {
            Self { calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl CompletionProvider for Echo {
        async fn complete(&self, prompt: &str, max_tokens: u32, _settings: &GenerateSettings) -> anyhow::Result<String> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((prompt.to_string(), max_tokens));
            Ok(format!("summary {}", calls.len()))
        }
    }

    fn word_meter() -> TokenMeter {
        TokenMeter::with_counter(|text| text.split_whitespace().count())
    }

    fn settings() -> GenerateSettings {
        GenerateSettings::default()
            .with_query("Q")
            .with_chunk_token_length(4)
            .with_max_number_of_summaries(10)
    }

    fn fragments(texts: &[&str]) -> Vec<Fragment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Fragment::new(vec![i.into()], *t))
            .collect()
    }

    #[test]
    fn test_prepare_chunks_duplicates_first() {
        let summary = SummaryLoop::new(Echo::new(), word_meter(), Arc::new(settings()));
        let chunks = summary.prepare_chunks(&fragments(&["a b c", "d e", "f"]));
        assert_eq!(chunks, vec!["a b c\nd e\n", "a b c\nd e\n", "f\n"]);
    }

    #[test]
    fn test_prepare_chunks_without_duplication() {
        let settings = settings().with_duplicate_first_chunk(false);
        let summary = SummaryLoop::new(Echo::new(), word_meter(), Arc::new(settings));
        let chunks = summary.prepare_chunks(&fragments(&["a b c", "d e", "f"]));
        assert_eq!(chunks, vec!["a b c\nd e\n", "f\n"]);
    }

    #[test]
    fn test_prepare_chunks_placeholder_when_empty() {
        let summary = SummaryLoop::new(Echo::new(), word_meter(), Arc::new(settings()));
        assert_eq!(summary.prepare_chunks(&[]), vec![NO_COMMENTS]);
    }

    #[test]
    fn test_prepare_chunks_respects_strict_policy() {
        let settings = settings().with_overflow_policy(OverflowPolicy::Strict);
        let summary = SummaryLoop::new(Echo::new(), word_meter(), Arc::new(settings));
        let chunks = summary.prepare_chunks(&fragments(&["a b c", "d e", "f"]));
        assert_eq!(chunks, vec!["a b c\n", "a b c\n", "d e\nf\n"]);
    }

    #[tokio::test]
    async fn test_initial_context_short_selftext_kept() {
        let summary = SummaryLoop::new(Echo::new(), word_meter(), Arc::new(settings()));
        assert_eq!(summary.initial_context("T", "body").await, "T\nbody");
        assert_eq!(summary.initial_context("T", "").await, "T\nNo selftext");
        assert!(summary.provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_initial_context_long_selftext_condensed() {
        let settings = settings().with_max_token_length(10);
        let summary = SummaryLoop::new(Echo::new(), word_meter(), Arc::new(settings));

        let context = summary.initial_context("T", "this selftext is long").await;
        assert_eq!(context, "T\nsummary 1");

        let calls = summary.provider.calls.lock().unwrap();
        assert_eq!(calls[0].1, 500);
        assert!(calls[0].0.starts_with("shorten this text to ~500 GPT tokens"));
    }

    #[tokio::test]
    async fn test_output_carried_into_next_round() {
        let settings = settings().with_max_number_of_summaries(2);
        let summary = SummaryLoop::new(Echo::new(), word_meter(), Arc::new(settings));

        let (prompts, outputs) = summary
            .summarize("T\nbody".to_string(), &["c1\n".to_string(), "c2\n".to_string()], "rust")
            .await;

        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Title: T\nbody"));
        // Round 2 condenses round 1's output ("summary 1") first, producing call 2
        let calls = summary.provider.calls.lock().unwrap();
        assert!(calls[1].0.ends_with("summarization: summary 1"));
        assert!(prompts[1].contains("Title: summary 2"));
        assert_eq!(outputs, vec!["summary 1", "summary 3"]);
    }
}
