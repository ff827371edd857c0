use std::sync::Arc;

use async_trait::async_trait;
use sift_cli::{save_output, thread_input};
use sift_context::{CompletionProvider, Encoding, SummaryLoop, TokenMeter};
use sift_types::{GenerateSettings, ThreadNode};

struct FixedProvider;

#[async_trait]
impl CompletionProvider for FixedProvider {
    async fn complete(&self, _prompt: &str, _max_tokens: u32, _settings: &GenerateSettings) -> anyhow::Result<String> {
        Ok("A calm discussion about editions.".to_string())
    }
}

const THREAD: &str = r#"[
  {"kind": "Listing", "data": {"children": [{"kind": "t3", "data": {
    "title": "Will there ever be a Rust 2.0?",
    "selftext": "",
    "subreddit": "rust"
  }}]}},
  {"kind": "Listing", "data": {"children": [
    {"kind": "t1", "data": {"author": "alice", "body": "Editions make a 2.0 unnecessary.",
      "replies": {"kind": "Listing", "data": {"children": [
        {"kind": "t1", "data": {"author": "bob", "body": "Agreed."}}
      ]}}}},
    {"kind": "t1", "data": {"author": "[deleted]", "body": "[removed]"}}
  ]}}
]"#;

#[tokio::test]
async fn test_thread_to_saved_report() {
    let document: ThreadNode = serde_json::from_str(THREAD).unwrap();
    let input = thread_input(&document, "https://www.reddit.com/r/rust/comments/abc/rust_20/").unwrap();
    assert_eq!(input.fragments.len(), 3);

    let settings = GenerateSettings::default().with_query("Summarize the thread.");
    let meter = TokenMeter::new(Encoding::R50k).unwrap();
    let summary = SummaryLoop::new(FixedProvider, meter, Arc::new(settings));

    let record = summary.run(&input).await.unwrap();

    // One packed chunk, fed twice
    assert_eq!(record.rounds(), 2);
    assert_eq!(record.chunks[0], record.chunks[1]);
    assert!(record.prompts[0].contains("Title: Will there ever be a Rust 2.0?\nNo selftext"));
    assert!(record.prompts[0].contains("[alice] Editions make a 2.0 unnecessary.\n[bob] Agreed.\n"));
    assert!(record.prompts[0].contains("<Comments subreddit='r/rust'>"));

    let tmp = tempfile::tempdir().unwrap();
    let path = save_output(tmp.path(), &record.title, &record.report).unwrap();
    let saved = std::fs::read_to_string(path).unwrap();
    assert!(saved.starts_with("============\nSUMMARY COUNT: 0\n"));
    assert!(saved.contains("A calm discussion about editions."));
}
