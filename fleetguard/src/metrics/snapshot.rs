//! Point-in-time metrics snapshot.

use super::state::{AggregatedState, CHANNELS};
use crate::external::NotifyChannel;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// SLO fraction at or above which the pipeline counts as healthy.
const HEALTHY_SLO_FRACTION: f64 = 0.95;

/// SLO fraction below which the pipeline counts as critical.
const CRITICAL_SLO_FRACTION: f64 = 0.80;

/// Health of the pipeline, derived from the SLO fraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Critical => "critical",
        }
    }

    /// Derives health from the SLO fraction.
    pub fn from_slo(fraction: f64) -> Self {
        if fraction >= HEALTHY_SLO_FRACTION {
            Self::Healthy
        } else if fraction >= CRITICAL_SLO_FRACTION {
            Self::Degraded
        } else {
            Self::Critical
        }
    }
}

/// Incident counts by priority.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct PriorityCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// Per-channel notification outcomes.
#[derive(Clone, Debug, Serialize)]
pub struct ChannelStats {
    pub channel: NotifyChannel,
    pub sent: u64,
    pub failed: u64,
}

/// A point-in-time health and throughput snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub generated_at: DateTime<Utc>,

    pub incidents_total: u64,
    pub incidents_active: u64,
    pub by_priority: PriorityCounts,

    pub dispatched_total: u64,
    pub dispatch_partial_failures: u64,
    pub external_dispatch_failures: u64,
    pub avg_processing_ms: f64,
    pub avg_response_ms: f64,

    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub channels: Vec<ChannelStats>,

    pub escalations_total: u64,
    pub resolved_total: u64,
    pub false_alarms_total: u64,

    pub critical_processed: u64,
    pub critical_under_target: u64,
    /// Fraction of critical incidents processed under the 5-second target.
    pub slo_fraction: f64,
    pub health: HealthStatus,
}

impl MetricsSnapshot {
    /// Builds a snapshot from the aggregated state.
    pub fn from_state(state: &AggregatedState) -> Self {
        let slo_fraction = state.slo_fraction();
        Self {
            generated_at: Utc::now(),
            incidents_total: state.incidents_total,
            incidents_active: state.incidents_active,
            by_priority: PriorityCounts {
                critical: state.critical_total,
                high: state.high_total,
                medium: state.medium_total,
                low: state.low_total,
            },
            dispatched_total: state.dispatched_total,
            dispatch_partial_failures: state.dispatch_partial_failures,
            external_dispatch_failures: state.external_dispatch_failures,
            avg_processing_ms: state.avg_processing_ms(),
            avg_response_ms: state.avg_response_ms(),
            notifications_sent: state.notifications_sent,
            notifications_failed: state.notifications_failed,
            channels: CHANNELS
                .iter()
                .enumerate()
                .map(|(index, channel)| ChannelStats {
                    channel: *channel,
                    sent: state.sent_by_channel[index],
                    failed: state.failed_by_channel[index],
                })
                .collect(),
            escalations_total: state.escalations_total,
            resolved_total: state.resolved_total,
            false_alarms_total: state.false_alarms_total,
            critical_processed: state.critical_processed,
            critical_under_target: state.critical_under_target,
            slo_fraction,
            health: HealthStatus::from_slo(slo_fraction),
        }
    }
}
