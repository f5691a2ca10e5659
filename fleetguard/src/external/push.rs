//! Push-channel registry boundary.
//!
//! Best-effort delivery to connected listeners; no delivery guarantee. The
//! critical fast path uses [`PushRegistry::broadcast_to_all`] so the fastest
//! channel never waits on directory resolution.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors from push delivery.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("push delivery failed: {0}")]
    Delivery(String),
}

/// Registry of connected push-channel listeners.
#[async_trait]
pub trait PushRegistry: Send + Sync {
    /// Delivers an event to one connected user, if present.
    async fn send_to_user(&self, user_id: &str, event: &str, payload: Value)
        -> Result<(), PushError>;

    /// Broadcasts an event to every connected listener.
    async fn broadcast_to_all(&self, event: &str, payload: Value) -> Result<(), PushError>;
}

/// Registry that records deliveries in the log. Default local wiring.
pub struct LogPushRegistry;

#[async_trait]
impl PushRegistry for LogPushRegistry {
    async fn send_to_user(
        &self,
        user_id: &str,
        event: &str,
        _payload: Value,
    ) -> Result<(), PushError> {
        debug!(user_id, event, "Push event delivered");
        Ok(())
    }

    async fn broadcast_to_all(&self, event: &str, _payload: Value) -> Result<(), PushError> {
        debug!(event, "Push event broadcast");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_registry_accepts_sends() {
        let registry = LogPushRegistry;
        assert!(registry
            .send_to_user("op-1", "incident_alert", json!({}))
            .await
            .is_ok());
        assert!(registry
            .broadcast_to_all("critical_alert", json!({}))
            .await
            .is_ok());
    }
}
