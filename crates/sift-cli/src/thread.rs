use std::sync::LazyLock;

use regex::Regex;
use sift_context::{flatten, ThreadInput};
use sift_types::{PathSegment, ThreadNode};
use thiserror::Error;

static SUBREDDIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/r/(\w+)/").expect("subreddit pattern is valid"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetadataError {
    #[error("{0} not found in thread data")]
    MissingField(&'static str),
}

/// Post fields read from the first listing of a thread document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMetadata {
    pub title: String,
    pub selftext: String,
    pub subreddit: Option<String>,
}

fn post_data(doc: &ThreadNode) -> Option<&ThreadNode> {
    let path: [PathSegment; 5] = [0.into(), "data".into(), "children".into(), 0.into(), "data".into()];
    doc.walk(&path)
}

/// Read title, selftext and subreddit from `doc[0].data.children[0].data`
pub fn thread_metadata(doc: &ThreadNode) -> Result<ThreadMetadata, MetadataError> {
    let data = post_data(doc).ok_or(MetadataError::MissingField("Post data"))?;
    let field = |name: &'static str| {
        data.get(name)
            .and_then(ThreadNode::as_str)
            .map(str::to_string)
            .ok_or(MetadataError::MissingField(name))
    };

    Ok(ThreadMetadata {
        title: field("title")?,
        selftext: field("selftext")?,
        subreddit: field("subreddit").ok(),
    })
}

/// Subreddit name from a `/r/<name>/` URL segment
pub fn subreddit_from_url(url: &str) -> Option<String> {
    SUBREDDIT.captures(url).map(|c| c[1].to_string())
}

/// Everything the summary loop needs from a fetched thread
pub fn thread_input(doc: &ThreadNode, url: &str) -> Result<ThreadInput, MetadataError> {
    let metadata = thread_metadata(doc)?;
    let subreddit = metadata
        .subreddit
        .or_else(|| subreddit_from_url(url))
        .unwrap_or_default();

    Ok(ThreadInput {
        title: metadata.title,
        selftext: metadata.selftext,
        subreddit,
        fragments: flatten(doc, vec![]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> ThreadNode {
        ThreadNode::from(json!([
            {"data": {"children": [{"data": {
                "title": "Rust 2.0?",
                "selftext": "",
                "subreddit": "rust"
            }}]}},
            {"data": {"children": [
                {"data": {"author": "a1", "body": "No."}}
            ]}}
        ]))
    }

    #[test]
    fn test_thread_metadata() {
        let metadata = thread_metadata(&doc()).unwrap();
        assert_eq!(metadata.title, "Rust 2.0?");
        assert_eq!(metadata.selftext, "");
        assert_eq!(metadata.subreddit.as_deref(), Some("rust"));
    }

    #[test]
    fn test_missing_fields() {
        let no_title = ThreadNode::from(json!([{"data": {"children": [{"data": {"selftext": "x"}}]}}]));
        assert_eq!(thread_metadata(&no_title), Err(MetadataError::MissingField("title")));

        let no_selftext = ThreadNode::from(json!([{"data": {"children": [{"data": {"title": "x"}}]}}]));
        assert_eq!(thread_metadata(&no_selftext), Err(MetadataError::MissingField("selftext")));

        let empty = ThreadNode::from(json!([]));
        assert!(thread_metadata(&empty).is_err());
    }

    #[test]
    fn test_subreddit_from_url() {
        assert_eq!(
            subreddit_from_url("https://www.reddit.com/r/rust/comments/abc/t/").as_deref(),
            Some("rust")
        );
        assert_eq!(subreddit_from_url("https://example.com/"), None);
    }

    #[test]
    fn test_thread_input_collects_comments() {
        let input = thread_input(&doc(), "https://www.reddit.com/r/other/comments/x/y/").unwrap();
        assert_eq!(input.subreddit, "rust");
        assert_eq!(input.fragments.len(), 1);
        assert_eq!(input.fragments[0].text, "[a1] No.");
    }
}
