use serde::{Deserialize, Serialize};

/// Emitted after each completed summary round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 0..=100, integer division of completed rounds over total rounds
    pub percent: u8,
    /// 1-based index of the round just completed
    pub round: usize,
    pub prompt: String,
    pub output: String,
}

impl Progress {
    pub fn new(round: usize, rounds: usize, prompt: impl Into<String>, output: impl Into<String>) -> Self {
        let percent = if rounds == 0 {
            100
        } else {
            (round.min(rounds) * 100 / rounds) as u8
        };
        Self {
            percent,
            round,
            prompt: prompt.into(),
            output: output.into(),
        }
    }
}
