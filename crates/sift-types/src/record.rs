use serde::{Deserialize, Serialize};

const ROUND_RULE: &str = "============";
const REPORT_END: &str = "===========================";

/// Everything produced by one summarization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub title: String,
    pub selftext: String,
    pub subreddit: String,
    pub prompts: Vec<String>,
    pub outputs: Vec<String>,
    pub chunks: Vec<String>,
    pub report: String,
}

impl SummaryRecord {
    /// Number of rounds that produced an output
    pub fn rounds(&self) -> usize {
        self.outputs.len()
    }

    /// Output of the last round, which carries the cumulative summary
    pub fn final_summary(&self) -> Option<&str> {
        self.outputs.last().map(String::as_str)
    }
}

/// Formats one round's block of the report
pub fn format_round(count: usize, prompt: &str, output: &str) -> String {
    format!(
        "{rule}\nSUMMARY COUNT: {count}\n{rule}\nPROMPT: {prompt}\n\n{output}\n{end}\n",
        rule = ROUND_RULE,
        end = REPORT_END,
    )
}

/// Joins all rounds into the report text, one block per (prompt, output) pair
pub fn format_report(prompts: &[String], outputs: &[String]) -> String {
    prompts
        .iter()
        .zip(outputs)
        .enumerate()
        .map(|(i, (prompt, output))| format_round(i, prompt, output))
        .collect::<Vec<_>>()
        .join("\n")
}
