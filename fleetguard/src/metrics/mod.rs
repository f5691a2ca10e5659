//! Metrics collection and health reporting.
//!
//! Three layers:
//!
//! 1. **Emission** ([`MetricsClient`]) - fire-and-forget event emission from
//!    the intake path, orchestrator, propagation engine, and escalation
//!    monitor
//! 2. **Aggregation** ([`MetricsDaemon`]) - independent async task updating
//!    counters and publishing state to a shared handle
//! 3. **Reporting** ([`MetricsSnapshot`]) - point-in-time view including the
//!    primary SLO signal: the fraction of critical incidents processed under
//!    the 5-second target
//!
//! The daemon additionally emits a periodic health snapshot to the log and,
//! when wired, the broadcast bus.

mod client;
mod daemon;
mod event;
mod snapshot;
mod state;

pub use client::MetricsClient;
pub use daemon::{MetricsDaemon, SharedMetricsState};
pub use event::MetricEvent;
pub use snapshot::{ChannelStats, HealthStatus, MetricsSnapshot, PriorityCounts};
pub use state::AggregatedState;

use crate::config::MetricsSettings;
use crate::external::BroadcastBus;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The complete metrics system: client factory plus daemon lifecycle.
pub struct MetricsSystem {
    client: MetricsClient,
    state_handle: SharedMetricsState,
    daemon_handle: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl MetricsSystem {
    /// Creates the system and spawns the aggregation daemon.
    ///
    /// Must be called from within a tokio runtime. When `bus` is provided,
    /// periodic health snapshots are published on the metrics topic.
    pub fn start(settings: MetricsSettings, bus: Option<Arc<dyn BroadcastBus>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = MetricsClient::new(tx);

        let daemon = MetricsDaemon::new(rx, settings, bus);
        let state_handle = daemon.state_handle();
        let shutdown = CancellationToken::new();

        let daemon_shutdown = shutdown.clone();
        let daemon_handle = Some(tokio::spawn(async move {
            daemon.run(daemon_shutdown).await;
        }));

        Self {
            client,
            state_handle,
            daemon_handle,
            shutdown,
        }
    }

    /// Returns a clone of the metrics client. Cheap; distribute freely.
    pub fn client(&self) -> MetricsClient {
        self.client.clone()
    }

    /// Builds a point-in-time snapshot from the current aggregated state.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state_handle.read().unwrap_or_else(|e| e.into_inner());
        MetricsSnapshot::from_state(&state)
    }

    /// Shuts the daemon down and waits for it to drain.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.daemon_handle.take() {
            let _ = handle.await;
        }
    }

    /// True while the daemon is still running.
    pub fn is_running(&self) -> bool {
        self.daemon_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::IncidentPriority;
    use std::time::Duration;

    #[tokio::test]
    async fn test_system_lifecycle() {
        let system = MetricsSystem::start(MetricsSettings::default(), None);
        assert!(system.is_running());

        let client = system.client();
        client.incident_triggered(IncidentPriority::Critical);
        client.incident_dispatched(IncidentPriority::Critical, 1_200, false);

        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = system.snapshot();
        assert_eq!(snapshot.incidents_total, 1);
        assert_eq!(snapshot.by_priority.critical, 1);
        assert_eq!(snapshot.critical_under_target, 1);

        system.shutdown().await;
    }

    #[tokio::test]
    async fn test_snapshot_slo_fraction() {
        let system = MetricsSystem::start(MetricsSettings::default(), None);
        let client = system.client();

        // Three fast criticals, one slow.
        for _ in 0..3 {
            client.incident_triggered(IncidentPriority::Critical);
            client.incident_dispatched(IncidentPriority::Critical, 800, false);
        }
        client.incident_triggered(IncidentPriority::Critical);
        client.incident_dispatched(IncidentPriority::Critical, 7_500, false);

        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = system.snapshot();
        assert_eq!(snapshot.critical_processed, 4);
        assert_eq!(snapshot.critical_under_target, 3);
        assert!((snapshot.slo_fraction - 0.75).abs() < 1e-9);

        system.shutdown().await;
    }
}
