//! Metric events for the emission layer.
//!
//! Events are fire-and-forget: producers send them to the daemon without
//! waiting for acknowledgment, and a dropped event never affects the
//! pipeline.

use crate::external::NotifyChannel;
use crate::incident::IncidentPriority;

/// Events emitted by pipeline components to the metrics daemon.
#[derive(Clone, Debug)]
pub enum MetricEvent {
    /// An incident passed validation and entered the queue.
    IncidentTriggered { priority: IncidentPriority },

    /// All three dispatch sub-tasks settled.
    IncidentDispatched {
        priority: IncidentPriority,
        /// Trigger-to-dispatched duration in milliseconds.
        processing_ms: u64,
        /// True when one or more sub-tasks failed.
        partial_failure: bool,
    },

    /// The external gateway call failed outright.
    ExternalDispatchFailed,

    /// One notification send succeeded.
    NotificationSent { channel: NotifyChannel },

    /// One notification send failed or timed out.
    NotificationFailed { channel: NotifyChannel },

    /// Fan-out for one incident finished.
    PropagationCompleted {
        targets_resolved: usize,
        notified: usize,
        failed: usize,
        duration_ms: u64,
    },

    /// An operator acknowledged an incident.
    IncidentAcknowledged {
        /// Trigger-to-acknowledged duration in milliseconds.
        response_ms: u64,
    },

    /// An incident crossed an escalation threshold.
    IncidentEscalated { level: u8 },

    /// An incident was resolved.
    IncidentResolved,

    /// An incident was closed as a false alarm.
    FalseAlarm,
}

impl MetricEvent {
    /// Short name for this event type (useful for debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::IncidentTriggered { .. } => "incident_triggered",
            Self::IncidentDispatched { .. } => "incident_dispatched",
            Self::ExternalDispatchFailed => "external_dispatch_failed",
            Self::NotificationSent { .. } => "notification_sent",
            Self::NotificationFailed { .. } => "notification_failed",
            Self::PropagationCompleted { .. } => "propagation_completed",
            Self::IncidentAcknowledged { .. } => "incident_acknowledged",
            Self::IncidentEscalated { .. } => "incident_escalated",
            Self::IncidentResolved => "incident_resolved",
            Self::FalseAlarm => "false_alarm",
        }
    }
}
