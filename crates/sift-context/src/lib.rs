//! Chunking and token budgeting for comment-thread summaries.
//!
//! A thread document is flattened into fragments, packed into token-bounded
//! chunks and fed through a multi-round completion loop where each round's
//! output becomes context for the next.

pub mod condenser;
pub mod error;
pub mod flatten;
pub mod packer;
pub mod prompt;
pub mod provider;
pub mod summarizer;
pub mod tokens;

pub use condenser::Condenser;
pub use error::{ContextError, Result};
pub use flatten::{flatten, flatten_with, Flatten, FlattenFields, DELETED_AUTHOR, MAX_DEPTH};
pub use packer::ChunkPacker;
pub use prompt::{assemble, fit_to_budget};
pub use provider::{complete_text, CompletionProvider, LlmProvider, Logged, RateLimited};
pub use summarizer::{ProgressCallback, SummaryLoop, ThreadInput, NO_COMMENTS, NO_SELFTEXT};
pub use tokens::{estimate_word_count, validate_positive, Encoding, TokenMeter};
