//! Metrics aggregation daemon.
//!
//! The daemon owns the mutable [`AggregatedState`] and is its only writer.
//! Readers access a shared `RwLock` copy that the daemon refreshes after
//! every processed event, so snapshot reads never block event processing.
//! A periodic tick emits the health snapshot to the log and, when wired,
//! the broadcast bus.

use super::event::MetricEvent;
use super::snapshot::MetricsSnapshot;
use super::state::AggregatedState;
use crate::config::MetricsSettings;
use crate::external::{topic, BroadcastBus};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shared state handle for read-only snapshot access.
pub type SharedMetricsState = Arc<RwLock<AggregatedState>>;

/// The metrics aggregation daemon.
pub struct MetricsDaemon {
    rx: mpsc::UnboundedReceiver<MetricEvent>,
    state: AggregatedState,
    shared_state: SharedMetricsState,
    settings: MetricsSettings,
    bus: Option<Arc<dyn BroadcastBus>>,
}

impl MetricsDaemon {
    pub fn new(
        rx: mpsc::UnboundedReceiver<MetricEvent>,
        settings: MetricsSettings,
        bus: Option<Arc<dyn BroadcastBus>>,
    ) -> Self {
        Self {
            rx,
            state: AggregatedState::new(),
            shared_state: Arc::new(RwLock::new(AggregatedState::new())),
            settings,
            bus,
        }
    }

    /// Returns a handle to the shared state.
    pub fn state_handle(&self) -> SharedMetricsState {
        Arc::clone(&self.shared_state)
    }

    /// Runs the daemon until shutdown is signalled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            report_interval_secs = self.settings.report_interval_secs,
            "Metrics daemon starting"
        );

        let mut report_interval = tokio::time::interval(self.settings.report_interval());
        report_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so the first report
        // covers a full interval.
        report_interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    break;
                }

                Some(event) = self.rx.recv() => {
                    self.process_event(event);
                    self.update_shared_state();
                }

                _ = report_interval.tick() => {
                    self.report_health().await;
                }
            }
        }

        self.update_shared_state();
        debug!("Metrics daemon stopped");
    }

    /// Processes a single event, updating the aggregated state.
    fn process_event(&mut self, event: MetricEvent) {
        match event {
            MetricEvent::IncidentTriggered { priority } => {
                self.state.record_triggered(priority);
            }
            MetricEvent::IncidentDispatched {
                priority,
                processing_ms,
                partial_failure,
            } => {
                self.state
                    .record_dispatched(priority, processing_ms, partial_failure);
            }
            MetricEvent::ExternalDispatchFailed => {
                self.state.external_dispatch_failures += 1;
            }
            MetricEvent::NotificationSent { channel } => {
                self.state.record_notification(channel, true);
            }
            MetricEvent::NotificationFailed { channel } => {
                self.state.record_notification(channel, false);
            }
            MetricEvent::PropagationCompleted { duration_ms, .. } => {
                self.state.propagations_completed += 1;
                self.state.propagation_ms_total += duration_ms;
            }
            MetricEvent::IncidentAcknowledged { response_ms } => {
                self.state.record_acknowledged(response_ms);
            }
            MetricEvent::IncidentEscalated { .. } => {
                self.state.escalations_total += 1;
            }
            MetricEvent::IncidentResolved => {
                self.state.record_closed(false);
            }
            MetricEvent::FalseAlarm => {
                self.state.record_closed(true);
            }
        }
    }

    /// Publishes the current state for readers.
    fn update_shared_state(&self) {
        match self.shared_state.write() {
            Ok(mut shared) => *shared = self.state.clone(),
            Err(poisoned) => *poisoned.into_inner() = self.state.clone(),
        }
    }

    /// Emits the periodic health snapshot.
    async fn report_health(&self) {
        let snapshot = MetricsSnapshot::from_state(&self.state);
        info!(
            health = snapshot.health.as_str(),
            incidents_total = snapshot.incidents_total,
            incidents_active = snapshot.incidents_active,
            slo_fraction = snapshot.slo_fraction,
            avg_processing_ms = snapshot.avg_processing_ms,
            notifications_failed = snapshot.notifications_failed,
            "Health report"
        );

        if let Some(bus) = &self.bus {
            match serde_json::to_value(&snapshot) {
                Ok(payload) => {
                    if let Err(error) = bus.publish(topic::METRICS_HEALTH, payload).await {
                        warn!(%error, "Failed to publish health snapshot");
                    }
                }
                Err(error) => warn!(%error, "Failed to serialize health snapshot"),
            }
        }
    }
}
