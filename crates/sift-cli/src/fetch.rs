use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use sift_types::ThreadNode;
use thiserror::Error;
use tracing::debug;

static THREAD_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?reddit\.com/([a-zA-Z0-9_-]+/)+[a-zA-Z0-9_-]+/$")
        .expect("thread url pattern is valid")
});

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid JSON from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Whether `url` looks like a thread permalink, e.g.
/// `https://www.reddit.com/r/rust/comments/abc123/some_title/`
pub fn is_valid_thread_url(url: &str) -> bool {
    THREAD_URL.is_match(url)
}

/// Swap the last path segment of a thread URL for the `.json` endpoint
pub fn thread_json_url(url: &str) -> String {
    let base = url.rsplit_once('/').map_or(url, |(head, _)| head);
    format!("{}.json", base)
}

/// GET a thread document
pub async fn fetch_json(url: &str, user_agent: &str, timeout: Duration) -> Result<ThreadNode, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?;

    debug!(url, "Fetching thread");
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|source| FetchError::Parse {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_thread_urls() {
        assert!(is_valid_thread_url(
            "https://www.reddit.com/r/rust/comments/abc123/some_title/"
        ));
        assert!(is_valid_thread_url("reddit.com/r/rust/comments/abc123/title-here/"));
        assert!(!is_valid_thread_url("https://www.reddit.com/r/rust/comments/abc123/some_title"));
        assert!(!is_valid_thread_url("https://example.com/r/rust/comments/abc/t/"));
    }

    #[test]
    fn test_thread_json_url() {
        assert_eq!(
            thread_json_url("https://www.reddit.com/r/rust/comments/abc123/some_title/"),
            "https://www.reddit.com/r/rust/comments/abc123/some_title.json"
        );
        assert_eq!(
            thread_json_url("https://www.reddit.com/r/rust/comments/abc123/some_title"),
            "https://www.reddit.com/r/rust/comments/abc123.json"
        );
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_request_error() {
        let result = fetch_json("http://127.0.0.1:9/thread.json", "Mozilla/5.0", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(FetchError::Request(_))));
    }
}
