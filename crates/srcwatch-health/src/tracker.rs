//! Failure-time accounting.
//!
//! Unresponsive time is approximated in whole poll intervals: every failed
//! probe adds one interval, every successful probe resets to zero. No
//! wall-clock latency is measured.

use std::time::Duration;

/// What a recorded probe result means for the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Success, and the previous probe succeeded too.
    Healthy,
    /// First success after one or more failures.
    Recovered { after: Duration },
    /// Failure, still under the threshold.
    Failing { accumulated: Duration },
    /// Failure that brought the accumulated time to the threshold.
    ThresholdReached { accumulated: Duration },
}

/// Accumulated failure time for one server.
#[derive(Debug, Clone, Default)]
pub struct FailureTracker {
    accumulated: Duration,
    poll_interval: Duration,
    threshold: Duration,
}

impl FailureTracker {
    pub fn new(poll_interval: Duration, threshold: Duration) -> Self {
        Self {
            accumulated: Duration::ZERO,
            poll_interval,
            threshold,
        }
    }

    /// Record a successful probe. Always leaves the accumulated time at zero.
    pub fn record_success(&mut self) -> Observation {
        let previous = std::mem::take(&mut self.accumulated);
        if previous.is_zero() {
            Observation::Healthy
        } else {
            Observation::Recovered { after: previous }
        }
    }

    /// Record a failed probe.
    pub fn record_failure(&mut self) -> Observation {
        self.accumulated = self.accumulated.saturating_add(self.poll_interval);
        if self.accumulated >= self.threshold {
            Observation::ThresholdReached {
                accumulated: self.accumulated,
            }
        } else {
            Observation::Failing {
                accumulated: self.accumulated,
            }
        }
    }

    /// Start over, e.g. after a restart was issued.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}
