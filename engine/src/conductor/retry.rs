//! Per-step retry state machine
//!
//! ```text
//! Pending -> Attempting(1) -> Succeeded
//!                          -> Failed                   (non-transient, or out of attempts)
//!                          -> RetryScheduled(delay) -> Attempting(2) -> ...
//! ```
//!
//! The machine only decides; the executor does the invoking and sleeping.
//! Delays double from `base_delay` per retry and are capped at `max_delay`.

use crate::config::ExecutorConfig;
use sdk::ToolError;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ExecutorConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay slept before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Attempting { attempt: u32 },
    RetryScheduled { attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Failed { attempts: u32 },
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: AttemptState,
    delays: Vec<Duration>,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: AttemptState::Pending,
            delays: Vec::new(),
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Move to the next attempt and return its number.
    ///
    /// Valid from `Pending` and `RetryScheduled`; any other state is left
    /// untouched and `None` is returned.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        let attempt = match self.state {
            AttemptState::Pending => 1,
            AttemptState::RetryScheduled { attempt, .. } => attempt + 1,
            _ => return None,
        };
        self.state = AttemptState::Attempting { attempt };
        Some(attempt)
    }

    pub fn record_success(&mut self) {
        if let AttemptState::Attempting { attempt } = self.state {
            self.state = AttemptState::Succeeded { attempts: attempt };
        }
    }

    /// Record a failed attempt. Returns the backoff delay when another
    /// attempt is scheduled, `None` when the step has failed for good.
    pub fn record_failure(&mut self, error: &ToolError) -> Option<Duration> {
        let AttemptState::Attempting { attempt } = self.state else {
            return None;
        };

        if error.is_transient() && attempt < self.policy.max_attempts {
            let delay = self.policy.delay_for(attempt);
            self.delays.push(delay);
            self.state = AttemptState::RetryScheduled { attempt, delay };
            Some(delay)
        } else {
            self.state = AttemptState::Failed { attempts: attempt };
            None
        }
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        match self.state {
            AttemptState::Pending => 0,
            AttemptState::Attempting { attempt } | AttemptState::RetryScheduled { attempt, .. } => {
                attempt
            }
            AttemptState::Succeeded { attempts } | AttemptState::Failed { attempts } => attempts,
        }
    }

    /// Backoff delays scheduled so far, in order
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}
