//! Retry configuration for kline requests

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wait between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backoff {
    /// `step * attempt`, attempt counted from 1
    Linear { step: Duration },
    /// Same wait after every attempt
    Fixed(Duration),
}

/// How often and how patiently a transport failure is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Fixed(Duration::ZERO),
        }
    }

    /// Wait after failed attempt number `attempt` (1-based), or `None`
    /// when that was the last attempt
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let delay = match self.backoff {
            Backoff::Linear { step } => step * attempt,
            Backoff::Fixed(delay) => delay,
        };
        Some(delay)
    }

    /// Sum of all waits of a request that fails every attempt
    pub fn total_wait(&self) -> Duration {
        (1..self.max_attempts)
            .filter_map(|attempt| self.delay_after(attempt))
            .sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::Linear {
                step: Duration::from_secs(5),
            },
        }
    }
}
