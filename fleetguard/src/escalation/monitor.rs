//! The escalation monitor daemon.

use crate::config::EscalationSettings;
use crate::dispatch::OpsAlert;
use crate::external::{
    topic, BroadcastBus, EmergencyGateway, EmergencyServiceRequest, NotificationMessage,
    OperatorDirectory,
};
use crate::incident::{ExternalNotification, Incident, IncidentState};
use crate::metrics::MetricsClient;
use crate::propagation::PropagationEngine;
use crate::store::{IncidentStore, IncidentUpdate, StoreError};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Minimum operator weight per escalation tier (level 1, level 2).
const TIER_MIN_RANKS: [u8; 2] = [5, 7];

/// Tier name recorded on the incident per level.
fn tier_name(level: u8) -> &'static str {
    match level {
        1 => "senior_operations",
        2 => "management_security",
        _ => "external_services",
    }
}

/// Errors from manual escalation requests.
#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("incident {0} is already at the maximum escalation level")]
    MaxLevelReached(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Timer-driven watcher promoting unacknowledged incidents.
pub struct EscalationMonitor {
    store: Arc<dyn IncidentStore>,
    directory: Arc<dyn OperatorDirectory>,
    propagation: Arc<PropagationEngine>,
    gateway: Arc<dyn EmergencyGateway>,
    bus: Arc<dyn BroadcastBus>,
    metrics: MetricsClient,
    settings: EscalationSettings,
}

impl EscalationMonitor {
    pub fn new(
        store: Arc<dyn IncidentStore>,
        directory: Arc<dyn OperatorDirectory>,
        propagation: Arc<PropagationEngine>,
        gateway: Arc<dyn EmergencyGateway>,
        bus: Arc<dyn BroadcastBus>,
        metrics: MetricsClient,
        settings: EscalationSettings,
    ) -> Self {
        Self {
            store,
            directory,
            propagation,
            gateway,
            bus,
            metrics,
            settings,
        }
    }

    /// Runs the periodic sweep until cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            sweep_interval_secs = self.settings.sweep_interval_secs,
            thresholds = ?self.settings.thresholds_secs,
            "Escalation monitor starting"
        );

        let mut interval = tokio::time::interval(self.settings.sweep_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = interval.tick() => {
                    self.sweep().await;
                }
            }
        }

        debug!("Escalation monitor stopped");
    }

    /// Inspects every incident still awaiting acknowledgment or response
    /// and escalates those past their current level's threshold.
    async fn sweep(&self) {
        let incidents = match self.store.list_active().await {
            Ok(incidents) => incidents,
            Err(error) => {
                warn!(%error, "Escalation sweep could not list incidents");
                return;
            }
        };

        let now = Utc::now();
        for incident in incidents {
            if !self.is_watched(&incident) {
                continue;
            }
            let level = incident.escalation_level;
            let Some(threshold) = self.settings.threshold_for_level(level) else {
                continue;
            };
            let elapsed = (now - incident.triggered_at)
                .to_std()
                .unwrap_or_default();
            if elapsed >= threshold {
                self.escalate_to_level(&incident, level + 1).await;
            }
        }
    }

    /// True for states the monitor watches: unacknowledged, or acknowledged
    /// but not yet responding.
    fn is_watched(&self, incident: &Incident) -> bool {
        incident.state.is_awaiting_ack() || incident.state == IncidentState::Acknowledged
    }

    /// Manual escalation, invoked through the respond API.
    pub async fn escalate(&self, incident: &Incident) -> Result<(), EscalationError> {
        let level = incident.escalation_level;
        if level >= self.settings.max_level() {
            return Err(EscalationError::MaxLevelReached(incident.id));
        }
        self.escalate_to_level(incident, level + 1).await;
        Ok(())
    }

    /// Escalates one incident to `new_level`, exactly once per threshold:
    /// the update is guarded on the previous level, so a racing sweep or
    /// acknowledgment makes this a no-op instead of a double escalation.
    async fn escalate_to_level(&self, incident: &Incident, new_level: u8) {
        let update = IncidentUpdate {
            state: Some(IncidentState::Escalated),
            expected_level: Some(new_level - 1),
            escalation_level: Some(new_level),
            escalated_at: Some(Utc::now()),
            escalated_to: Some(tier_name(new_level).to_string()),
            ..Default::default()
        };

        let escalated = match self.store.update(incident.id, update).await {
            Ok(incident) => incident,
            Err(StoreError::Conflict { .. }) | Err(StoreError::Terminal(_)) => {
                debug!(incident_id = %incident.id, "Escalation raced another transition; skipped");
                return;
            }
            Err(error) => {
                warn!(incident_id = %incident.id, %error, "Escalation update failed");
                return;
            }
        };

        self.metrics.incident_escalated(new_level);
        info!(
            incident_id = %escalated.id,
            code = %escalated.code,
            level = new_level,
            tier = tier_name(new_level),
            "Incident escalated"
        );

        let _ = self
            .bus
            .publish(
                topic::INCIDENT_ESCALATED,
                json!({
                    "incident_id": escalated.id,
                    "code": escalated.code,
                    "level": new_level,
                    "tier": tier_name(new_level),
                }),
            )
            .await;

        self.notify_tier(&escalated, new_level).await;
    }

    /// Notifies the broader tier for the new level.
    async fn notify_tier(&self, incident: &Incident, level: u8) {
        match level {
            1 | 2 => {
                let min_rank = TIER_MIN_RANKS[(level - 1) as usize];
                let targets = match self
                    .directory
                    .resolve_targets(&incident.region_id, min_rank)
                    .await
                {
                    Ok(targets) => targets,
                    Err(error) => {
                        warn!(incident_id = %incident.id, level, %error, "Escalation target resolution failed");
                        return;
                    }
                };

                let message = NotificationMessage::for_escalation(incident, level);
                let alert = OpsAlert::for_incident(incident);
                let fan_out = self
                    .propagation
                    .deliver(incident, &targets, &message, &alert)
                    .await;

                let bookkeeping = IncidentUpdate {
                    add_notified_operators: fan_out.notified_ids,
                    add_notification_attempts: fan_out.result.attempts() as u32,
                    ..Default::default()
                };
                if let Err(error) = self.store.update(incident.id, bookkeeping).await {
                    warn!(incident_id = %incident.id, %error, "Escalation bookkeeping failed");
                }
            }
            _ => {
                // Level 3: re-engage external services.
                let request = EmergencyServiceRequest::for_incident(incident);
                match self.gateway.dispatch(&request).await {
                    Ok(dispatches) => {
                        let update = IncidentUpdate {
                            add_external_notifications: dispatches
                                .into_iter()
                                .map(|d| ExternalNotification {
                                    service: d.service.as_str().to_string(),
                                    status: d.status.as_str().to_string(),
                                    reference: d.reference,
                                })
                                .collect(),
                            ..Default::default()
                        };
                        if let Err(error) = self.store.update(incident.id, update).await {
                            warn!(incident_id = %incident.id, %error, "Escalation dispatch bookkeeping failed");
                        }
                    }
                    Err(error) => {
                        self.metrics.external_dispatch_failed();
                        warn!(incident_id = %incident.id, %error, "Escalation external dispatch failed");
                        let _ = self
                            .bus
                            .publish(
                                topic::PIPELINE_FAILURE,
                                json!({
                                    "incident_id": incident.id,
                                    "stage": "escalation_dispatch",
                                    "error": error.to_string(),
                                }),
                            )
                            .await;
                    }
                }
            }
        }
    }
}
