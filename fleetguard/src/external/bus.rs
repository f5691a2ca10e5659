//! Broadcast bus boundary.
//!
//! The bus carries cross-instance propagation of triggers, acknowledgments,
//! failures, and the critical-alert fast path. Delivery mechanics (broker,
//! pub/sub transport) are the implementation's concern; the engine only
//! publishes and subscribes.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// Well-known bus topics.
pub mod topic {
    pub const INCIDENT_TRIGGERED: &str = "incident.triggered";
    pub const INCIDENT_DISPATCHED: &str = "incident.dispatched";
    pub const INCIDENT_ACKNOWLEDGED: &str = "incident.acknowledged";
    pub const INCIDENT_RESPONDING: &str = "incident.responding";
    pub const INCIDENT_RESOLVED: &str = "incident.resolved";
    pub const INCIDENT_ESCALATED: &str = "incident.escalated";
    pub const INCIDENT_FALSE_ALARM: &str = "incident.false_alarm";
    /// Critical fast-path broadcast, published before target resolution.
    pub const INCIDENT_CRITICAL: &str = "incident.critical";
    /// Post-acceptance failures needing operator visibility.
    pub const PIPELINE_FAILURE: &str = "incident.pipeline_failure";
    pub const OPS_ALERT: &str = "ops.alert";
    pub const DRIVER_STATUS: &str = "driver.status";
    pub const METRICS_HEALTH: &str = "metrics.health";
}

/// One published message.
#[derive(Clone, Debug)]
pub struct BusEvent {
    pub topic: String,
    pub payload: Value,
}

/// Errors publishing to the bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("broadcast bus unavailable: {0}")]
    Unavailable(String),
}

/// Cross-instance broadcast bus.
#[async_trait]
pub trait BroadcastBus: Send + Sync {
    /// Publishes a payload on a topic. Best-effort fan-out to subscribers.
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), BusError>;

    /// Subscribes to the full event stream; callers filter by topic.
    fn subscribe(&self) -> broadcast::Receiver<BusEvent>;
}

/// Default subscriber buffer depth.
const IN_PROCESS_BUS_CAPACITY: usize = 512;

/// Single-process bus over a tokio broadcast channel.
///
/// Publishing never fails and never blocks; with no subscribers the event
/// is simply dropped, matching broker fire-and-forget semantics.
pub struct InProcessBus {
    tx: broadcast::Sender<BusEvent>,
}

impl InProcessBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(IN_PROCESS_BUS_CAPACITY);
        Self { tx }
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BroadcastBus for InProcessBus {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), BusError> {
        // A send error only means no subscribers are currently listening.
        let _ = self.tx.send(BusEvent {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }
}
