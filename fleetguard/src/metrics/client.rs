//! Metrics emission layer.
//!
//! The [`MetricsClient`] is cheap to clone and fire-and-forget: it never
//! blocks and silently ignores failures, so metrics collection never
//! impacts the life-safety path.

use super::event::MetricEvent;
use crate::external::NotifyChannel;
use crate::incident::IncidentPriority;
use tokio::sync::mpsc;

/// Client for emitting metric events to the metrics daemon.
#[derive(Clone)]
pub struct MetricsClient {
    tx: mpsc::UnboundedSender<MetricEvent>,
}

impl MetricsClient {
    pub fn new(tx: mpsc::UnboundedSender<MetricEvent>) -> Self {
        Self { tx }
    }

    /// Sends an event to the daemon (fire-and-forget).
    #[inline]
    fn send(&self, event: MetricEvent) {
        // Ignore send errors - daemon may have shut down
        let _ = self.tx.send(event);
    }

    #[inline]
    pub fn incident_triggered(&self, priority: IncidentPriority) {
        self.send(MetricEvent::IncidentTriggered { priority });
    }

    #[inline]
    pub fn incident_dispatched(
        &self,
        priority: IncidentPriority,
        processing_ms: u64,
        partial_failure: bool,
    ) {
        self.send(MetricEvent::IncidentDispatched {
            priority,
            processing_ms,
            partial_failure,
        });
    }

    #[inline]
    pub fn external_dispatch_failed(&self) {
        self.send(MetricEvent::ExternalDispatchFailed);
    }

    #[inline]
    pub fn notification_sent(&self, channel: NotifyChannel) {
        self.send(MetricEvent::NotificationSent { channel });
    }

    #[inline]
    pub fn notification_failed(&self, channel: NotifyChannel) {
        self.send(MetricEvent::NotificationFailed { channel });
    }

    #[inline]
    pub fn propagation_completed(
        &self,
        targets_resolved: usize,
        notified: usize,
        failed: usize,
        duration_ms: u64,
    ) {
        self.send(MetricEvent::PropagationCompleted {
            targets_resolved,
            notified,
            failed,
            duration_ms,
        });
    }

    #[inline]
    pub fn incident_acknowledged(&self, response_ms: u64) {
        self.send(MetricEvent::IncidentAcknowledged { response_ms });
    }

    #[inline]
    pub fn incident_escalated(&self, level: u8) {
        self.send(MetricEvent::IncidentEscalated { level });
    }

    #[inline]
    pub fn incident_resolved(&self) {
        self.send(MetricEvent::IncidentResolved);
    }

    #[inline]
    pub fn false_alarm(&self) {
        self.send(MetricEvent::FalseAlarm);
    }
}
