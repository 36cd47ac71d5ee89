//! Client-side status polling with a bounded retry budget.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::tasks::state::PollOutcome;

pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How a polling session ended, from the client's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollReport {
    Ready(String),
    /// The server no longer knows the task (never issued or already delivered).
    NotFound,
    /// The client gave up. The task itself may still be running.
    TimedOut { attempts: u32 },
}

/// Repeats a status check until it yields a result or the budget runs out.
#[derive(Debug, Clone, Copy)]
pub struct StatusPoller {
    attempts: u32,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Run `check` up to `attempts` times, sleeping `interval` between
    /// checks that report `StillRunning`.
    pub async fn wait<F, Fut>(&self, mut check: F) -> PollReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PollOutcome>,
    {
        for attempt in 1..=self.attempts {
            match check().await {
                PollOutcome::Ready(text) => return PollReport::Ready(text),
                PollOutcome::NotFound => return PollReport::NotFound,
                PollOutcome::StillRunning => {
                    debug!(attempt, max = self.attempts, "Task still running");
                    if attempt < self.attempts {
                        tokio::time::sleep(self.interval).await;
                    }
                }
            }
        }
        PollReport::TimedOut {
            attempts: self.attempts,
        }
    }
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL)
    }
}
