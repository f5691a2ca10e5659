//! Aggregated metrics state.
//!
//! Plain counters and totals owned by the daemon. Averages and fractions
//! are computed at read time from totals, never stored incrementally.

use crate::config::PROCESSING_TARGET_MS;
use crate::external::NotifyChannel;
use crate::incident::IncidentPriority;

/// Index into the per-channel counter arrays.
fn channel_index(channel: NotifyChannel) -> usize {
    match channel {
        NotifyChannel::Push => 0,
        NotifyChannel::Sms => 1,
        NotifyChannel::Email => 2,
        NotifyChannel::Voice => 3,
    }
}

/// All channels, in counter-array order.
pub(crate) const CHANNELS: [NotifyChannel; 4] = [
    NotifyChannel::Push,
    NotifyChannel::Sms,
    NotifyChannel::Email,
    NotifyChannel::Voice,
];

/// Aggregated counters and totals.
#[derive(Clone, Debug, Default)]
pub struct AggregatedState {
    pub incidents_total: u64,
    pub incidents_active: u64,
    pub critical_total: u64,
    pub high_total: u64,
    pub medium_total: u64,
    pub low_total: u64,

    pub dispatched_total: u64,
    pub dispatch_partial_failures: u64,
    pub external_dispatch_failures: u64,
    pub processing_ms_total: u64,

    /// Critical incidents that completed dispatch, and how many of them
    /// came in under the processing target.
    pub critical_processed: u64,
    pub critical_under_target: u64,

    pub acknowledged_total: u64,
    pub response_ms_total: u64,

    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub sent_by_channel: [u64; 4],
    pub failed_by_channel: [u64; 4],

    pub propagations_completed: u64,
    pub propagation_ms_total: u64,

    pub escalations_total: u64,
    pub resolved_total: u64,
    pub false_alarms_total: u64,
}

impl AggregatedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_triggered(&mut self, priority: IncidentPriority) {
        self.incidents_total += 1;
        self.incidents_active += 1;
        match priority {
            IncidentPriority::Critical => self.critical_total += 1,
            IncidentPriority::High => self.high_total += 1,
            IncidentPriority::Medium => self.medium_total += 1,
            IncidentPriority::Low => self.low_total += 1,
        }
    }

    pub fn record_dispatched(
        &mut self,
        priority: IncidentPriority,
        processing_ms: u64,
        partial_failure: bool,
    ) {
        self.dispatched_total += 1;
        self.processing_ms_total += processing_ms;
        if partial_failure {
            self.dispatch_partial_failures += 1;
        }
        if priority == IncidentPriority::Critical {
            self.critical_processed += 1;
            if processing_ms < PROCESSING_TARGET_MS {
                self.critical_under_target += 1;
            }
        }
    }

    pub fn record_notification(&mut self, channel: NotifyChannel, success: bool) {
        let index = channel_index(channel);
        if success {
            self.notifications_sent += 1;
            self.sent_by_channel[index] += 1;
        } else {
            self.notifications_failed += 1;
            self.failed_by_channel[index] += 1;
        }
    }

    pub fn record_acknowledged(&mut self, response_ms: u64) {
        self.acknowledged_total += 1;
        self.response_ms_total += response_ms;
    }

    pub fn record_closed(&mut self, false_alarm: bool) {
        self.incidents_active = self.incidents_active.saturating_sub(1);
        if false_alarm {
            self.false_alarms_total += 1;
        } else {
            self.resolved_total += 1;
        }
    }

    /// Rolling average trigger-to-dispatched duration.
    pub fn avg_processing_ms(&self) -> f64 {
        if self.dispatched_total == 0 {
            0.0
        } else {
            self.processing_ms_total as f64 / self.dispatched_total as f64
        }
    }

    /// Rolling average trigger-to-acknowledged duration.
    pub fn avg_response_ms(&self) -> f64 {
        if self.acknowledged_total == 0 {
            0.0
        } else {
            self.response_ms_total as f64 / self.acknowledged_total as f64
        }
    }

    /// Fraction of critical incidents processed under the target.
    ///
    /// The primary SLO signal. With no critical incidents processed yet the
    /// objective is vacuously met.
    pub fn slo_fraction(&self) -> f64 {
        if self.critical_processed == 0 {
            1.0
        } else {
            self.critical_under_target as f64 / self.critical_processed as f64
        }
    }
}
