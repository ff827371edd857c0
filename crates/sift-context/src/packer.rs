use std::sync::LazyLock;

use regex::Regex;
use sift_types::OverflowPolicy;

use crate::tokens::{estimate_word_count, longest_fitting_prefix, truncate_chars, TokenMeter};

/// Token size a single fragment is cut down to before packing
pub const FRAGMENT_TOKEN_CAP: usize = 1000;

static NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+").expect("newline pattern is valid"));

/// Collapse newline runs, trim, cut to the fragment cap and terminate with `\n`
pub fn normalize_fragment(text: &str) -> String {
    let collapsed = NEWLINES.replace_all(text, "\n");
    let trimmed = collapsed.trim();
    let mut piece = truncate_chars(trimmed, estimate_word_count(FRAGMENT_TOKEN_CAP)).to_string();
    piece.push('\n');
    piece
}

/// Groups fragments into token-bounded chunks
#[derive(Debug, Clone)]
pub struct ChunkPacker {
    meter: TokenMeter,
    policy: OverflowPolicy,
}

impl ChunkPacker {
    pub fn new(meter: TokenMeter, policy: OverflowPolicy) -> Self {
        Self { meter, policy }
    }

    /// Pack fragments in order into chunks of at most `token_length` tokens.
    ///
    /// Under [`OverflowPolicy::Greedy`] a chunk is closed right after the
    /// fragment that pushes it over the bound, so that chunk may exceed it.
    /// [`OverflowPolicy::Strict`] keeps every chunk within the bound.
    pub fn pack<I, S>(&self, fragments: I, token_length: usize) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pieces = fragments.into_iter().map(|f| normalize_fragment(f.as_ref()));
        match self.policy {
            OverflowPolicy::Greedy => self.pack_greedy(pieces, token_length),
            OverflowPolicy::Strict => self.pack_strict(pieces, token_length),
        }
    }

    fn pack_greedy(&self, pieces: impl Iterator<Item = String>, token_length: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut acc = String::new();

        for piece in pieces {
            acc.push_str(&piece);
            if self.meter.count(&acc) > token_length {
                chunks.push(std::mem::take(&mut acc));
            }
        }
        if !acc.is_empty() {
            chunks.push(acc);
        }
        chunks
    }

    fn pack_strict(&self, pieces: impl Iterator<Item = String>, token_length: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut acc = String::new();

        for piece in pieces {
            if !acc.is_empty() && self.meter.count(&format!("{}{}", acc, piece)) > token_length {
                chunks.push(std::mem::take(&mut acc));
            }

            let mut rest = piece.as_str();
            while !self.meter.fits(rest, token_length) {
                let mut end = longest_fitting_prefix(rest, |p| self.meter.fits(p, token_length));
                if end == 0 {
                    // Bound too small for even one character; take one to make progress
                    end = rest.chars().next().map_or(rest.len(), char::len_utf8);
                }
                chunks.push(rest[..end].to_string());
                rest = &rest[end..];
            }
            acc.push_str(rest);
        }
        if !acc.is_empty() {
            chunks.push(acc);
        }
        chunks
    }
}
