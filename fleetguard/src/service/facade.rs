//! The incident service facade.

use super::error::ServiceError;
use crate::config::ConfigFile;
use crate::dispatch::{DeadLetter, DispatchOrchestrator};
use crate::engine::IncidentEngine;
use crate::escalation::EscalationMonitor;
use crate::external::{
    topic, BroadcastBus, ChannelSender, DriverOperatingStatus, EmergencyGateway, FleetDirectory,
    InProcessBus, LogChannelSender, LogFleetDirectory, LogGateway, LogPushRegistry,
    NotifyChannel, OperatorDirectory, PushRegistry, StaticDirectory,
};
use crate::incident::{
    self, Incident, IncidentState, IncidentSubmission,
};
use crate::metrics::{MetricsClient, MetricsSnapshot, MetricsSystem};
use crate::propagation::PropagationEngine;
use crate::store::{IncidentStore, IncidentUpdate, InMemoryIncidentStore};
use chrono::Utc;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Injected collaborator implementations.
///
/// Constructed once at startup and handed to [`IncidentService::start`];
/// tests and single-node deployments can begin from [`Collaborators::local`]
/// and replace individual members.
pub struct Collaborators {
    pub store: Arc<dyn IncidentStore>,
    pub bus: Arc<dyn BroadcastBus>,
    pub push: Arc<dyn PushRegistry>,
    pub directory: Arc<dyn OperatorDirectory>,
    pub gateway: Arc<dyn EmergencyGateway>,
    pub fleet: Arc<dyn FleetDirectory>,
    pub senders: Vec<Arc<dyn ChannelSender>>,
}

impl Collaborators {
    /// Fully in-process wiring: in-memory store, loopback bus, logging
    /// gateway/fleet/channel implementations, empty operator roster.
    pub fn local() -> Self {
        Self {
            store: Arc::new(InMemoryIncidentStore::new()),
            bus: Arc::new(InProcessBus::new()),
            push: Arc::new(LogPushRegistry),
            directory: Arc::new(StaticDirectory::new(Vec::new())),
            gateway: Arc::new(LogGateway),
            fleet: Arc::new(LogFleetDirectory),
            senders: vec![
                Arc::new(LogChannelSender::new(NotifyChannel::Push)),
                Arc::new(LogChannelSender::new(NotifyChannel::Sms)),
                Arc::new(LogChannelSender::new(NotifyChannel::Email)),
                Arc::new(LogChannelSender::new(NotifyChannel::Voice)),
            ],
        }
    }
}

/// How an operator is responding to an incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    /// A response team is being dispatched.
    Dispatch,
    /// The incident is being closed as handled.
    Resolve,
    /// Escalate to the next tier immediately.
    Escalate,
}

/// An operator response to an incident.
#[derive(Clone, Debug)]
pub struct RespondRequest {
    pub responder_id: String,
    pub response_type: ResponseType,
    pub message: Option<String>,
    pub eta_minutes: Option<u32>,
}

/// The incident pipeline service.
///
/// Owns the background daemons (drain loop, escalation monitor, metrics)
/// and exposes the produced API. Construct once at startup, share by
/// reference, and call [`shutdown`](Self::shutdown) on exit.
pub struct IncidentService {
    store: Arc<dyn IncidentStore>,
    bus: Arc<dyn BroadcastBus>,
    fleet: Arc<dyn FleetDirectory>,
    escalation: Arc<EscalationMonitor>,
    metrics_system: MetricsSystem,
    metrics: MetricsClient,
    intake_tx: mpsc::Sender<Incident>,
    dead_letter_rx: Mutex<Option<mpsc::UnboundedReceiver<DeadLetter>>>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl IncidentService {
    /// Wires all components and spawns the background daemons.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: ConfigFile, collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            bus,
            push,
            directory,
            gateway,
            fleet,
            senders,
        } = collaborators;

        let metrics_system =
            MetricsSystem::start(config.metrics.clone(), Some(Arc::clone(&bus)));
        let metrics = metrics_system.client();

        let (dead_letter_tx, dead_letter_rx) = mpsc::unbounded_channel();
        let (intake_tx, intake_rx) = mpsc::channel(config.engine.intake_capacity);

        let orchestrator = DispatchOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            Arc::clone(&fleet),
            Arc::clone(&bus),
            metrics.clone(),
            dead_letter_tx,
        );
        let propagation = Arc::new(PropagationEngine::new(
            Arc::clone(&directory),
            senders,
            push,
            Arc::clone(&bus),
            Arc::clone(&store),
            metrics.clone(),
            config.propagation.clone(),
        ));
        let engine = IncidentEngine::new(
            intake_rx,
            orchestrator,
            Arc::clone(&propagation),
            config.engine.clone(),
        );
        let escalation = Arc::new(EscalationMonitor::new(
            Arc::clone(&store),
            directory,
            propagation,
            gateway,
            Arc::clone(&bus),
            metrics.clone(),
            config.escalation.clone(),
        ));

        let shutdown = CancellationToken::new();
        let tasks = vec![
            tokio::spawn(engine.run(shutdown.clone())),
            tokio::spawn(Arc::clone(&escalation).run(shutdown.clone())),
        ];

        info!("Incident service started");

        Self {
            store,
            bus,
            fleet,
            escalation,
            metrics_system,
            metrics,
            intake_tx,
            dead_letter_rx: Mutex::new(Some(dead_letter_rx)),
            shutdown,
            tasks,
        }
    }

    /// Validates, persists, and enqueues a submission.
    ///
    /// Returns immediately with the `triggered` incident while dispatch and
    /// propagation continue asynchronously; intake latency is decoupled
    /// from downstream processing.
    pub async fn trigger_incident(
        &self,
        submission: IncidentSubmission,
    ) -> Result<Incident, ServiceError> {
        let normalized = incident::validate(&submission)?;

        let triggered_at = Utc::now();
        let incident = Incident {
            id: Uuid::new_v4(),
            code: Incident::derive_code(normalized.category, normalized.priority, triggered_at),
            case_ref: normalized.case_ref,
            category: normalized.category,
            priority: normalized.priority,
            severity: Incident::derive_severity(normalized.category, normalized.priority),
            reporter: normalized.reporter,
            location: normalized.location,
            region_id: normalized.region_id,
            trip_id: normalized.trip_id,
            vehicle_id: normalized.vehicle_id,
            driver_id: normalized.driver_id,
            description: normalized.description,
            attachments: normalized.attachments,
            extensions: normalized.extensions,
            state: IncidentState::Triggered,
            triggered_at,
            propagation_started_at: None,
            propagation_completed_at: None,
            acknowledged_at: None,
            acknowledged_by: None,
            responded_at: None,
            responded_by: None,
            resolved_at: None,
            processing_ms: None,
            response_ms: None,
            escalation_level: 0,
            escalated_at: None,
            escalated_to: None,
            external_notifications: Vec::new(),
            notified_operators: Vec::new(),
            notification_attempts: 0,
        };

        self.store.save(incident.clone()).await?;
        self.metrics.incident_triggered(incident.priority);

        self.intake_tx
            .try_send(incident.clone())
            .map_err(|error| match error {
                mpsc::error::TrySendError::Full(_) => ServiceError::Saturated,
                mpsc::error::TrySendError::Closed(_) => ServiceError::EngineStopped,
            })?;

        info!(
            incident_id = %incident.id,
            code = %incident.code,
            priority = %incident.priority,
            category = %incident.category,
            "Incident triggered"
        );
        let _ = self
            .bus
            .publish(
                topic::INCIDENT_TRIGGERED,
                json!({
                    "incident_id": incident.id,
                    "code": incident.code,
                    "priority": incident.priority,
                    "category": incident.category,
                    "region_id": incident.region_id,
                }),
            )
            .await;

        Ok(incident)
    }

    /// Acknowledges an incident and stamps its response duration.
    ///
    /// Rejects with a state error unless the incident is still awaiting
    /// acknowledgment; a second acknowledgment always fails.
    pub async fn acknowledge(
        &self,
        id: Uuid,
        by: &str,
        message: Option<String>,
    ) -> Result<(), ServiceError> {
        let incident = self.store.get(id).await?;
        incident.state.transition(id, IncidentState::Acknowledged)?;

        let now = Utc::now();
        let response_ms = (now - incident.triggered_at).num_milliseconds().max(0) as u64;
        let update = IncidentUpdate {
            state: Some(IncidentState::Acknowledged),
            acknowledged_at: Some(now),
            acknowledged_by: Some(by.to_string()),
            response_ms: Some(response_ms),
            ..Default::default()
        };
        self.store.update(id, update).await?;
        self.metrics.incident_acknowledged(response_ms);

        info!(incident_id = %id, by, response_ms, "Incident acknowledged");
        let _ = self
            .bus
            .publish(
                topic::INCIDENT_ACKNOWLEDGED,
                json!({
                    "incident_id": id,
                    "by": by,
                    "response_ms": response_ms,
                    "message": message,
                }),
            )
            .await;
        Ok(())
    }

    /// Records an operator response: dispatch a team, resolve, or escalate.
    pub async fn respond(&self, id: Uuid, request: RespondRequest) -> Result<(), ServiceError> {
        let incident = self.store.get(id).await?;
        match request.response_type {
            ResponseType::Dispatch => {
                incident.state.transition(id, IncidentState::Responding)?;
                let update = IncidentUpdate {
                    state: Some(IncidentState::Responding),
                    responded_at: Some(Utc::now()),
                    responded_by: Some(request.responder_id.clone()),
                    ..Default::default()
                };
                self.store.update(id, update).await?;

                info!(incident_id = %id, responder = %request.responder_id, "Response dispatched");
                let _ = self
                    .bus
                    .publish(
                        topic::INCIDENT_RESPONDING,
                        json!({
                            "incident_id": id,
                            "responder_id": request.responder_id,
                            "eta_minutes": request.eta_minutes,
                            "message": request.message,
                        }),
                    )
                    .await;
                Ok(())
            }
            ResponseType::Resolve => {
                self.close(incident, &request.responder_id, false).await
            }
            ResponseType::Escalate => {
                self.escalation.escalate(&incident).await?;
                Ok(())
            }
        }
    }

    /// Closes an incident as a false alarm, from any non-terminal state.
    pub async fn mark_false_alarm(&self, id: Uuid, by: &str) -> Result<(), ServiceError> {
        let incident = self.store.get(id).await?;
        self.close(incident, by, true).await
    }

    /// Shared resolution path. Releases any driver emergency flag and
    /// publishes the closing event.
    async fn close(
        &self,
        incident: Incident,
        by: &str,
        false_alarm: bool,
    ) -> Result<(), ServiceError> {
        let id = incident.id;
        let target = if false_alarm {
            IncidentState::FalseAlarm
        } else {
            IncidentState::Resolved
        };
        incident.state.transition(id, target)?;

        let update = IncidentUpdate {
            state: Some(target),
            resolved_at: Some(Utc::now()),
            responded_by: Some(by.to_string()),
            ..Default::default()
        };
        self.store.update(id, update).await?;

        if let Some(driver_id) = incident.driver_id.as_deref() {
            if let Err(error) = self
                .fleet
                .set_driver_status(driver_id, DriverOperatingStatus::Normal)
                .await
            {
                warn!(incident_id = %id, driver_id, %error, "Failed to release driver emergency state");
            } else {
                let _ = self
                    .bus
                    .publish(
                        topic::DRIVER_STATUS,
                        json!({
                            "driver_id": driver_id,
                            "status": DriverOperatingStatus::Normal,
                            "incident_id": id,
                        }),
                    )
                    .await;
            }
        }

        if false_alarm {
            self.metrics.false_alarm();
        } else {
            self.metrics.incident_resolved();
        }

        info!(incident_id = %id, by, state = target.as_str(), "Incident closed");
        let closing_topic = if false_alarm {
            topic::INCIDENT_FALSE_ALARM
        } else {
            topic::INCIDENT_RESOLVED
        };
        let _ = self
            .bus
            .publish(closing_topic, json!({ "incident_id": id, "by": by }))
            .await;
        Ok(())
    }

    /// Every incident not yet in a terminal state.
    pub async fn active_incidents(&self) -> Result<Vec<Incident>, ServiceError> {
        Ok(self.store.list_active().await?)
    }

    /// One incident by id.
    pub async fn incident(&self, id: Uuid) -> Result<Incident, ServiceError> {
        Ok(self.store.get(id).await?)
    }

    /// Current metrics snapshot, including the SLO fraction.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics_system.snapshot()
    }

    /// Takes the dead-letter receiver for operator tooling. Yields `None`
    /// after the first call.
    pub fn take_dead_letters(&self) -> Option<mpsc::UnboundedReceiver<DeadLetter>> {
        self.dead_letter_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Stops all daemons and waits for them to finish.
    pub async fn shutdown(mut self) {
        info!("Incident service shutting down");
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        self.metrics_system.shutdown().await;
    }
}
