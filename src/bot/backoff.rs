//! Bounded exponential backoff for failed reconciliation passes
//!
//! Applied by the scheduler between ticks after a pass fails, so a
//! struggling Discord or media-server API is never retried in a tight
//! loop within the same pass.

use std::time::Duration;

const BACKOFF_BASE_MS: u64 = 500;
const MAX_EXPONENT: u32 = 4;

/// Exponential backoff: 500ms, 1s, 2s, 4s, 8s, then capped
#[derive(Debug, Default)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    /// Start with no delay accumulated
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay before the next attempt
    pub fn next(&mut self) -> Duration {
        let exponent = self.attempt.min(MAX_EXPONENT);
        self.attempt += 1;
        Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(exponent))
    }

    /// Clear accumulated failures after a successful pass
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
