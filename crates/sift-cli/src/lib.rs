pub mod config;
pub mod fetch;
pub mod logging;
pub mod output;
pub mod thread;

pub use config::Config;
pub use fetch::{fetch_json, is_valid_thread_url, thread_json_url, FetchError};
pub use output::{generate_filename, save_output};
pub use thread::{subreddit_from_url, thread_input, thread_metadata, MetadataError, ThreadMetadata};
