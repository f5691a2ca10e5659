//! The dispatch orchestrator.

use super::alert::OpsAlert;
use crate::external::{
    topic, BroadcastBus, DriverOperatingStatus, EmergencyGateway, EmergencyServiceRequest,
    FleetDirectory, ServiceDispatch,
};
use crate::incident::{ExternalNotification, Incident, IncidentState};
use crate::metrics::MetricsClient;
use crate::store::{IncidentStore, IncidentUpdate};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A failure routed to the dead-letter channel for manual intervention.
#[derive(Clone, Debug)]
pub struct DeadLetter {
    pub incident_id: Uuid,
    pub stage: &'static str,
    pub error: String,
    pub at: chrono::DateTime<Utc>,
}

/// Summary of which dispatch sub-tasks failed for one incident.
#[derive(Clone, Debug, Default)]
pub struct DispatchPartialFailure {
    pub incident_id: Uuid,
    /// `(stage, error)` pairs, one per failed sub-task.
    pub failures: Vec<(&'static str, String)>,
}

impl DispatchPartialFailure {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of dispatching one incident.
pub struct DispatchOutcome {
    /// The record as stored after the dispatched-state write.
    pub incident: Incident,
    /// The materialised internal alert, input to propagation.
    pub alert: OpsAlert,
    /// Present when one or more sub-tasks failed.
    pub partial_failure: Option<DispatchPartialFailure>,
}

/// Orchestrates the three dispatch sub-tasks for one incident at a time.
pub struct DispatchOrchestrator {
    store: Arc<dyn IncidentStore>,
    gateway: Arc<dyn EmergencyGateway>,
    fleet: Arc<dyn FleetDirectory>,
    bus: Arc<dyn BroadcastBus>,
    metrics: MetricsClient,
    dead_letter_tx: mpsc::UnboundedSender<DeadLetter>,
}

impl DispatchOrchestrator {
    pub fn new(
        store: Arc<dyn IncidentStore>,
        gateway: Arc<dyn EmergencyGateway>,
        fleet: Arc<dyn FleetDirectory>,
        bus: Arc<dyn BroadcastBus>,
        metrics: MetricsClient,
        dead_letter_tx: mpsc::UnboundedSender<DeadLetter>,
    ) -> Self {
        Self {
            store,
            gateway,
            fleet,
            bus,
            metrics,
            dead_letter_tx,
        }
    }

    /// Dispatches one incident: runs the three sub-tasks concurrently,
    /// waits for all to settle, stamps the processing duration once, and
    /// moves the record to `dispatched`.
    ///
    /// Returns `None` when the incident can no longer be processed (for
    /// example it was closed as a false alarm while still queued); such
    /// cases are logged, never raised.
    pub async fn dispatch(&self, incident: Incident) -> Option<DispatchOutcome> {
        let id = incident.id;

        // Move to processing; a record closed while queued is skipped here.
        // An incident acknowledged before dispatch keeps its state but is
        // still dispatched; emergency actions must not be blocked.
        let incident = match self
            .store
            .update(id, IncidentUpdate::to_state(IncidentState::Processing))
            .await
        {
            Ok(incident) => incident,
            Err(crate::store::StoreError::State(_)) => match self.store.get(id).await {
                Ok(incident) if !incident.is_terminal() => incident,
                _ => return None,
            },
            Err(error) => {
                warn!(incident_id = %id, %error, "Incident no longer processable; skipping dispatch");
                return None;
            }
        };

        let mut partial = DispatchPartialFailure {
            incident_id: id,
            ..Default::default()
        };

        // The three sub-tasks settle independently; completion order does
        // not matter, only joint completion does.
        let (external, alert_publish, driver) = tokio::join!(
            self.request_external_dispatch(&incident),
            self.materialize_alert(&incident),
            self.flip_driver_status(&incident),
        );

        let external_notifications = match external {
            Ok(dispatches) => dispatches
                .into_iter()
                .map(|d: ServiceDispatch| ExternalNotification {
                    service: d.service.as_str().to_string(),
                    status: d.status.as_str().to_string(),
                    reference: d.reference,
                })
                .collect(),
            Err(error) => {
                self.metrics.external_dispatch_failed();
                self.report_failure(id, "external_dispatch", &error).await;
                partial.failures.push(("external_dispatch", error));
                // Pending reference-number slots stay visible on the record.
                EmergencyServiceRequest::for_incident(&incident)
                    .services
                    .iter()
                    .map(|service| ExternalNotification {
                        service: service.as_str().to_string(),
                        status: "failed".to_string(),
                        reference: None,
                    })
                    .collect()
            }
        };

        let (alert, publish_error) = alert_publish;
        if let Some(error) = publish_error {
            self.report_failure(id, "alert_publish", &error).await;
            partial.failures.push(("alert_publish", error));
        }

        if let Err(error) = driver {
            self.report_failure(id, "driver_status", &error).await;
            partial.failures.push(("driver_status", error));
        }

        // Processing duration is fixed here, exactly once.
        let processing_ms = (Utc::now() - incident.triggered_at)
            .num_milliseconds()
            .max(0) as u64;

        let update = IncidentUpdate {
            state: Some(IncidentState::Dispatched),
            processing_ms: Some(processing_ms),
            add_external_notifications: external_notifications,
            ..Default::default()
        };

        let incident = match self.store.update(id, update.clone()).await {
            Ok(incident) => incident,
            // The operator got there first: keep the stamps, leave the
            // acknowledged state in place.
            Err(crate::store::StoreError::State(_)) => {
                let stamps_only = IncidentUpdate {
                    state: None,
                    ..update
                };
                match self.store.update(id, stamps_only).await {
                    Ok(incident) => incident,
                    Err(error) => {
                        error!(incident_id = %id, %error, "Failed to store dispatch result");
                        self.report_failure(id, "store_update", &error.to_string()).await;
                        return None;
                    }
                }
            }
            Err(error) => {
                error!(incident_id = %id, %error, "Failed to store dispatch result");
                self.report_failure(id, "store_update", &error.to_string()).await;
                return None;
            }
        };

        let partial_failure = (!partial.is_empty()).then_some(partial);
        self.metrics.incident_dispatched(
            incident.priority,
            processing_ms,
            partial_failure.is_some(),
        );

        info!(
            incident_id = %id,
            code = %incident.code,
            priority = %incident.priority,
            processing_ms,
            partial_failure = partial_failure.is_some(),
            "Incident dispatched"
        );

        let _ = self
            .bus
            .publish(
                topic::INCIDENT_DISPATCHED,
                json!({
                    "incident_id": id,
                    "code": incident.code,
                    "priority": incident.priority,
                    "processing_ms": processing_ms,
                }),
            )
            .await;

        Some(DispatchOutcome {
            incident,
            alert,
            partial_failure,
        })
    }

    /// Sub-task 1: request real-world dispatch from the gateway.
    async fn request_external_dispatch(
        &self,
        incident: &Incident,
    ) -> Result<Vec<ServiceDispatch>, String> {
        let request = EmergencyServiceRequest::for_incident(incident);
        self.gateway
            .dispatch(&request)
            .await
            .map_err(|error| error.to_string())
    }

    /// Sub-task 2: materialise the internal alert and announce it.
    ///
    /// Building the alert cannot fail; the bus publish can, and a failed
    /// publish does not invalidate the alert for the propagation stage.
    async fn materialize_alert(&self, incident: &Incident) -> (OpsAlert, Option<String>) {
        let alert = OpsAlert::for_incident(incident);
        let publish_error = match serde_json::to_value(&alert) {
            Ok(payload) => self
                .bus
                .publish(topic::OPS_ALERT, payload)
                .await
                .err()
                .map(|error| error.to_string()),
            Err(error) => Some(error.to_string()),
        };
        (alert, publish_error)
    }

    /// Sub-task 3: flip the involved driver into the emergency state.
    async fn flip_driver_status(&self, incident: &Incident) -> Result<(), String> {
        let Some(driver_id) = incident.driver_id.as_deref() else {
            return Ok(());
        };

        self.fleet
            .set_driver_status(driver_id, DriverOperatingStatus::Emergency)
            .await
            .map_err(|error| error.to_string())?;

        let _ = self
            .bus
            .publish(
                topic::DRIVER_STATUS,
                json!({
                    "driver_id": driver_id,
                    "status": DriverOperatingStatus::Emergency,
                    "incident_id": incident.id,
                }),
            )
            .await;
        Ok(())
    }

    /// Logs a sub-task failure, publishes it for operator visibility, and
    /// queues it on the dead-letter channel.
    async fn report_failure(&self, incident_id: Uuid, stage: &'static str, error: &str) {
        error!(incident_id = %incident_id, stage, error, "Dispatch sub-task failed");

        let _ = self
            .bus
            .publish(
                topic::PIPELINE_FAILURE,
                json!({
                    "incident_id": incident_id,
                    "stage": stage,
                    "error": error,
                }),
            )
            .await;

        let _ = self.dead_letter_tx.send(DeadLetter {
            incident_id,
            stage,
            error: error.to_string(),
            at: Utc::now(),
        });
    }
}
