use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default provider quota: 10 calls per minute
pub const DEFAULT_MAX_CALLS: u32 = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter for completion calls
///
/// At most `max_calls` acquisitions succeed within any `window`. When the window is
/// saturated, [`RateLimiter::acquire`] sleeps until the oldest call ages out; there is
/// no queue beyond the waiting caller.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `max_calls` - Maximum calls allowed per window (clamped to at least 1)
    /// * `window` - Length of the sliding window
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a call slot is free, then claim it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut calls = self.calls.lock().await;
                let now = Instant::now();

                while let Some(oldest) = calls.front() {
                    if now.duration_since(*oldest) >= self.window {
                        calls.pop_front();
                    } else {
                        break;
                    }
                }

                if calls.len() < self.max_calls as usize {
                    calls.push_back(now);
                    return;
                }

                match calls.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };

            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit saturated, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS, DEFAULT_WINDOW)
    }
}
