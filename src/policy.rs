use crate::{client::ClientError, config::Scan, util::rounds_within};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollDecision {
    /// Leave the host pending and query again next round.
    Retry,
    /// Give up on the host and report it as failed.
    Abandon,
}

/// Decides what a failed or overlong poll means for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Consecutive transient errors tolerated; the host is abandoned on the next one,
    /// so 0 abandons on the first.
    pub max_poll_errors: u32,
    /// Poll rounds a host may stay pending; 0 means no limit.
    pub max_rounds: u32,
}

impl PollPolicy {
    pub fn from_config(cfg: &Scan) -> Self {
        Self {
            max_poll_errors: cfg.max_poll_errors,
            max_rounds: rounds_within(
                Duration::from_secs(cfg.assessment_timeout_secs),
                Duration::from_secs(cfg.poll_interval_secs.max(1)),
            ),
        }
    }

    /// `consecutive` counts this error too.
    pub fn on_error(&self, err: &ClientError, consecutive: u32) -> PollDecision {
        if err.is_transient() && consecutive <= self.max_poll_errors {
            PollDecision::Retry
        } else {
            PollDecision::Abandon
        }
    }

    pub fn timed_out(&self, rounds: u32) -> bool {
        self.max_rounds > 0 && rounds >= self.max_rounds
    }
}
