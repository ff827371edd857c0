use sift_types::GenerateSettings;
use tracing::{debug, warn};

use crate::tokens::{longest_fitting_prefix, TokenMeter};

/// Build the prompt for one summary round
pub fn assemble(chunk: &str, title: &str, settings: &GenerateSettings, subreddit: &str) -> String {
    format!(
        "{query}\n\n```Title: {title}\n\n<Comments subreddit='r/{subreddit}'>\n{chunk}\n</Comments>\n```",
        query = settings.query,
    )
}

/// Build the prompt from the longest prefix of `chunk` that keeps it within
/// `max_context_tokens`.
///
/// When even an empty chunk does not fit, the empty-chunk prompt is returned.
/// A truncated chunk fills the prompt up to `max_context_tokens`, which leaves
/// the round little or no output budget.
pub fn fit_to_budget(
    meter: &TokenMeter,
    chunk: &str,
    title: &str,
    settings: &GenerateSettings,
    subreddit: &str,
    max_context_tokens: usize,
) -> String {
    let fits = |prefix: &str| meter.fits(&assemble(prefix, title, settings, subreddit), max_context_tokens);

    let end = longest_fitting_prefix(chunk, &fits);
    if end < chunk.len() {
        debug!(
            kept_bytes = end,
            chunk_bytes = chunk.len(),
            max_context_tokens,
            "Truncated chunk to fit context"
        );
    }

    let prompt = assemble(&chunk[..end], title, settings, subreddit);
    if end == 0 && !fits("") {
        warn!(
            prompt_tokens = meter.count(&prompt),
            max_context_tokens, "Prompt exceeds context even without comments"
        );
    }
    prompt
}
