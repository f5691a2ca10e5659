//! Aggregated propagation outcome.

use crate::external::NotifyChannel;
use std::time::Duration;

/// Per-channel send outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: NotifyChannel,
    pub sent: usize,
    pub failed: usize,
}

/// Aggregated result of fanning out one incident.
///
/// Ephemeral: feeds the incident's fan-out bookkeeping and the metrics
/// daemon, then is dropped.
#[derive(Clone, Debug, Default)]
pub struct PropagationResult {
    /// Operators resolved by the directory query.
    pub targets_resolved: usize,
    /// Successful sends across all channels.
    pub notified: usize,
    /// Failed or timed-out sends across all channels.
    pub failed: usize,
    /// Breakdown by channel, in channel order.
    pub channels: Vec<ChannelOutcome>,
    /// Wall-clock duration of the fan-out.
    pub duration: Duration,
    /// True when the directory query itself failed.
    pub directory_failed: bool,
}

impl PropagationResult {
    /// Total individual send attempts.
    pub fn attempts(&self) -> usize {
        self.notified + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_sums_outcomes() {
        let result = PropagationResult {
            targets_resolved: 3,
            notified: 5,
            failed: 2,
            ..Default::default()
        };
        assert_eq!(result.attempts(), 7);
    }
}
