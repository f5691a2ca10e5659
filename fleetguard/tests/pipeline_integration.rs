//! Integration tests for the incident pipeline.
//!
//! These tests verify the complete intake → queue → dispatch → propagation
//! workflow including:
//! - The medical-emergency end-to-end scenario
//! - Validation rejection before anything is persisted
//! - Gateway failure tolerance (internal alerting must proceed)
//! - Acknowledgment idempotence and resolved-state immutability
//! - Intake latency decoupling from downstream dispatch

use async_trait::async_trait;
use fleetguard::config::ConfigFile;
use fleetguard::external::{
    ChannelError, ChannelSender, DriverOperatingStatus, EmergencyGateway,
    EmergencyServiceRequest, FleetDirectory, FleetError, GatewayError, NotificationMessage,
    NotificationTarget, NotifyChannel, OperatorRole, PushError, PushRegistry, ServiceDispatch,
    ServiceKind, StaticDirectory,
};
use fleetguard::incident::{IncidentState, IncidentSubmission};
use fleetguard::service::{Collaborators, IncidentService, RespondRequest, ResponseType};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

// =============================================================================
// Test Helpers
// =============================================================================

/// Gateway that records every request and can fail or stall on demand.
struct RecordingGateway {
    requests: Mutex<Vec<EmergencyServiceRequest>>,
    fail: bool,
    delay: Duration,
}

impl RecordingGateway {
    fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: false,
            delay: Duration::ZERO,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    fn requests(&self) -> Vec<EmergencyServiceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmergencyGateway for RecordingGateway {
    async fn dispatch(
        &self,
        request: &EmergencyServiceRequest,
    ) -> Result<Vec<ServiceDispatch>, GatewayError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(GatewayError::Unreachable("simulated outage".to_string()));
        }
        Ok(request
            .services
            .iter()
            .map(|service| ServiceDispatch {
                service: *service,
                status: fleetguard::external::DispatchStatus::Accepted,
                reference: Some(format!("REF-{}", service.as_str())),
            })
            .collect())
    }
}

/// Fleet directory recording every status flip.
struct RecordingFleet {
    flips: Mutex<Vec<(String, DriverOperatingStatus)>>,
}

impl RecordingFleet {
    fn new() -> Self {
        Self {
            flips: Mutex::new(Vec::new()),
        }
    }

    fn flips(&self) -> Vec<(String, DriverOperatingStatus)> {
        self.flips.lock().unwrap().clone()
    }
}

#[async_trait]
impl FleetDirectory for RecordingFleet {
    async fn set_driver_status(
        &self,
        driver_id: &str,
        status: DriverOperatingStatus,
    ) -> Result<(), FleetError> {
        self.flips
            .lock()
            .unwrap()
            .push((driver_id.to_string(), status));
        Ok(())
    }
}

/// Push registry counting broadcasts and per-user sends.
struct RecordingPush {
    broadcasts: AtomicUsize,
    user_sends: AtomicUsize,
}

impl RecordingPush {
    fn new() -> Self {
        Self {
            broadcasts: AtomicUsize::new(0),
            user_sends: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PushRegistry for RecordingPush {
    async fn send_to_user(
        &self,
        _user_id: &str,
        _event: &str,
        _payload: Value,
    ) -> Result<(), PushError> {
        self.user_sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn broadcast_to_all(&self, _event: &str, _payload: Value) -> Result<(), PushError> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Channel sender counting deliveries.
struct RecordingSender {
    channel: NotifyChannel,
    sends: Arc<AtomicUsize>,
}

#[async_trait]
impl ChannelSender for RecordingSender {
    fn channel(&self) -> NotifyChannel {
        self.channel
    }

    async fn send(
        &self,
        _target: &NotificationTarget,
        _message: &NotificationMessage,
    ) -> Result<(), ChannelError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn operator(id: &str, region: &str, weight: u8, channels: Vec<NotifyChannel>) -> NotificationTarget {
    NotificationTarget {
        operator_id: id.to_string(),
        role: OperatorRole::Dispatcher,
        region_id: Some(region.to_string()),
        channels,
        priority_weight: weight,
        on_duty: true,
        last_active: None,
    }
}

fn medical_submission() -> IncidentSubmission {
    IncidentSubmission {
        reporter_id: "passenger-11".to_string(),
        reporter_role: "passenger".to_string(),
        latitude: 14.5995,
        longitude: 121.0308,
        category: Some("medical_emergency".to_string()),
        priority: Some("critical".to_string()),
        region_id: Some("mnl".to_string()),
        driver_id: Some("driver-42".to_string()),
        trip_id: Some("trip-9001".to_string()),
        ..Default::default()
    }
}

async fn wait_for_state(service: &IncidentService, id: Uuid, state: IncidentState) {
    for _ in 0..250 {
        if service.incident(id).await.unwrap().state == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("incident {id} never reached {state}");
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_medical_critical_end_to_end() {
    let gateway = Arc::new(RecordingGateway::new());
    let fleet = Arc::new(RecordingFleet::new());
    let push = Arc::new(RecordingPush::new());
    let sends = Arc::new(AtomicUsize::new(0));

    let mut collaborators = Collaborators::local();
    collaborators.gateway = gateway.clone();
    collaborators.fleet = fleet.clone();
    collaborators.push = push.clone();
    collaborators.directory = Arc::new(StaticDirectory::new(vec![
        operator("op-1", "mnl", 3, vec![NotifyChannel::Sms]),
        operator("op-2", "mnl", 6, vec![]),
    ]));
    collaborators.senders = vec![
        Arc::new(RecordingSender {
            channel: NotifyChannel::Push,
            sends: sends.clone(),
        }),
        Arc::new(RecordingSender {
            channel: NotifyChannel::Sms,
            sends: sends.clone(),
        }),
    ];

    let service = IncidentService::start(ConfigFile::default(), collaborators);
    let started = Instant::now();
    let incident = service.trigger_incident(medical_submission()).await.unwrap();

    wait_for_state(&service, incident.id, IncidentState::Dispatched).await;
    let elapsed = started.elapsed();
    assert!(
        elapsed < Duration::from_secs(5),
        "critical incident must dispatch within budget, took {elapsed:?}"
    );

    // Required services derived from the medical category.
    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].services,
        vec![ServiceKind::National, ServiceKind::Medical]
    );

    // Driver flipped into the emergency state.
    assert_eq!(
        fleet.flips(),
        vec![("driver-42".to_string(), DriverOperatingStatus::Emergency)]
    );

    // Fast-path broadcast fired alongside the targeted fan-out.
    assert_eq!(push.broadcasts.load(Ordering::SeqCst), 1);

    // Allow propagation bookkeeping to settle.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stored = service.incident(incident.id).await.unwrap();
    assert!(stored.processing_ms.is_some());
    assert_eq!(stored.notified_operators.len(), 2);
    assert!(stored
        .external_notifications
        .iter()
        .all(|n| n.reference.is_some()));
    // op-1: push + sms, op-2: push.
    assert_eq!(sends.load(Ordering::SeqCst), 3);

    service.shutdown().await;
}

#[tokio::test]
async fn test_missing_reporter_rejected_before_persistence() {
    let service = IncidentService::start(ConfigFile::default(), Collaborators::local());

    let mut submission = medical_submission();
    submission.reporter_id = String::new();

    let error = service.trigger_incident(submission).await.unwrap_err();
    assert!(error.to_string().contains("reporter id"));

    // No incident was created and nothing was queued.
    assert!(service.active_incidents().await.unwrap().is_empty());
    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.incidents_total, 0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_gateway_failure_does_not_block_internal_alerting() {
    let gateway = Arc::new(RecordingGateway::failing());
    let fleet = Arc::new(RecordingFleet::new());
    let sends = Arc::new(AtomicUsize::new(0));

    let mut collaborators = Collaborators::local();
    collaborators.gateway = gateway.clone();
    collaborators.fleet = fleet.clone();
    collaborators.directory = Arc::new(StaticDirectory::new(vec![operator(
        "op-1",
        "mnl",
        3,
        vec![],
    )]));
    collaborators.senders = vec![Arc::new(RecordingSender {
        channel: NotifyChannel::Push,
        sends: sends.clone(),
    })];

    let service = IncidentService::start(ConfigFile::default(), collaborators);
    let mut dead_letters = service.take_dead_letters().unwrap();

    let incident = service.trigger_incident(medical_submission()).await.unwrap();
    wait_for_state(&service, incident.id, IncidentState::Dispatched).await;

    // The driver flip and operator propagation still happened.
    assert_eq!(fleet.flips().len(), 1);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sends.load(Ordering::SeqCst), 1);

    // The failure is visible: dead letter plus pending reference slots.
    let dead = tokio::select! {
        dead = dead_letters.recv() => dead.unwrap(),
        _ = tokio::time::sleep(Duration::from_secs(2)) => panic!("no dead letter"),
    };
    assert_eq!(dead.incident_id, incident.id);
    assert_eq!(dead.stage, "external_dispatch");

    let stored = service.incident(incident.id).await.unwrap();
    assert!(stored
        .external_notifications
        .iter()
        .all(|n| n.status == "failed" && n.reference.is_none()));

    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.dispatch_partial_failures, 1);
    assert_eq!(snapshot.external_dispatch_failures, 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_acknowledge_twice_fails_without_metrics_change() {
    let service = IncidentService::start(ConfigFile::default(), Collaborators::local());

    let incident = service.trigger_incident(medical_submission()).await.unwrap();
    wait_for_state(&service, incident.id, IncidentState::Dispatched).await;

    service.acknowledge(incident.id, "op-7", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let before = service.metrics_snapshot();

    let error = service
        .acknowledge(incident.id, "op-8", None)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("illegal transition"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let after = service.metrics_snapshot();
    assert_eq!(before.avg_response_ms, after.avg_response_ms);

    let stored = service.incident(incident.id).await.unwrap();
    assert_eq!(stored.acknowledged_by.as_deref(), Some("op-7"));

    service.shutdown().await;
}

#[tokio::test]
async fn test_resolve_releases_driver_and_freezes_record() {
    let fleet = Arc::new(RecordingFleet::new());
    let mut collaborators = Collaborators::local();
    collaborators.fleet = fleet.clone();

    let service = IncidentService::start(ConfigFile::default(), collaborators);

    let incident = service.trigger_incident(medical_submission()).await.unwrap();
    wait_for_state(&service, incident.id, IncidentState::Dispatched).await;

    service.acknowledge(incident.id, "op-7", None).await.unwrap();
    service
        .respond(
            incident.id,
            RespondRequest {
                responder_id: "op-7".to_string(),
                response_type: ResponseType::Resolve,
                message: None,
                eta_minutes: None,
            },
        )
        .await
        .unwrap();

    let stored = service.incident(incident.id).await.unwrap();
    assert_eq!(stored.state, IncidentState::Resolved);

    // Emergency flag released on resolution.
    let flips = fleet.flips();
    assert_eq!(flips.last().unwrap().1, DriverOperatingStatus::Normal);

    // A resolved record accepts no further mutation.
    assert!(service
        .respond(
            incident.id,
            RespondRequest {
                responder_id: "op-9".to_string(),
                response_type: ResponseType::Dispatch,
                message: None,
                eta_minutes: None,
            },
        )
        .await
        .is_err());

    service.shutdown().await;
}

#[tokio::test]
async fn test_intake_latency_decoupled_from_dispatch() {
    let gateway = Arc::new(RecordingGateway::slow(Duration::from_secs(1)));
    let mut collaborators = Collaborators::local();
    collaborators.gateway = gateway;

    let service = IncidentService::start(ConfigFile::default(), collaborators);

    let started = Instant::now();
    let incident = service.trigger_incident(medical_submission()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(incident.state, IncidentState::Triggered);
    assert!(
        elapsed < Duration::from_millis(500),
        "intake must return regardless of downstream dispatch duration, took {elapsed:?}"
    );

    wait_for_state(&service, incident.id, IncidentState::Dispatched).await;
    service.shutdown().await;
}

#[tokio::test]
async fn test_metrics_reflect_processed_criticals() {
    let service = IncidentService::start(ConfigFile::default(), Collaborators::local());

    let mut ids = Vec::new();
    for _ in 0..4 {
        let incident = service.trigger_incident(medical_submission()).await.unwrap();
        ids.push(incident.id);
    }
    for id in &ids {
        wait_for_state(&service, *id, IncidentState::Dispatched).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.incidents_total, 4);
    assert_eq!(snapshot.by_priority.critical, 4);
    assert_eq!(snapshot.critical_processed, 4);
    // In-process dispatch comfortably beats the 5s target.
    assert_eq!(snapshot.critical_under_target, 4);
    assert_eq!(snapshot.slo_fraction, 1.0);

    service.shutdown().await;
}
