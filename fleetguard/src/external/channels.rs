//! Notification channel senders.
//!
//! Each channel (push, SMS, email, voice) is an independent failure domain
//! behind the same [`ChannelSender`] trait. Retry policy is the channel
//! implementation's concern; the propagation engine only counts outcomes.

use super::directory::NotificationTarget;
use crate::incident::Incident;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Delivery channel for operator notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyChannel {
    Push,
    Sms,
    Email,
    Voice,
}

impl NotifyChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for NotifyChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The rendered notification handed to channel senders.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub incident_id: uuid::Uuid,
    pub code: String,
    pub title: String,
    pub body: String,
    pub priority: crate::incident::IncidentPriority,
    pub region_id: String,
}

impl NotificationMessage {
    /// Renders the standard alert message for an incident.
    pub fn for_incident(incident: &Incident) -> Self {
        let title = format!(
            "[{}] {} incident {}",
            incident.priority.code(),
            incident.category,
            incident.code
        );
        let body = match &incident.description {
            Some(description) => format!(
                "{} at ({:.4}, {:.4}), region {}",
                description,
                incident.location.latitude,
                incident.location.longitude,
                incident.region_id
            ),
            None => format!(
                "Reported by {} at ({:.4}, {:.4}), region {}",
                incident.reporter.id,
                incident.location.latitude,
                incident.location.longitude,
                incident.region_id
            ),
        };
        Self {
            incident_id: incident.id,
            code: incident.code.clone(),
            title,
            body,
            priority: incident.priority,
            region_id: incident.region_id.clone(),
        }
    }

    /// Renders the escalation variant, naming the level crossed.
    pub fn for_escalation(incident: &Incident, level: u8) -> Self {
        let mut message = Self::for_incident(incident);
        message.title = format!("[ESCALATED L{}] {}", level, message.title);
        message
    }
}

/// Errors from a single send attempt.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("send failed: {0}")]
    Send(String),

    /// Stamped by the propagation engine when a send exceeds its budget.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

/// One delivery channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel this sender serves.
    fn channel(&self) -> NotifyChannel;

    /// Delivers one message to one target.
    async fn send(
        &self,
        target: &NotificationTarget,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError>;
}

/// Sender that logs deliveries instead of performing them.
///
/// The default wiring for local runs; also a convenient test stand-in.
pub struct LogChannelSender {
    channel: NotifyChannel,
}

impl LogChannelSender {
    pub fn new(channel: NotifyChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelSender for LogChannelSender {
    fn channel(&self) -> NotifyChannel {
        self.channel
    }

    async fn send(
        &self,
        target: &NotificationTarget,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError> {
        info!(
            channel = self.channel.as_str(),
            operator_id = %target.operator_id,
            code = %message.code,
            "Notification delivered"
        );
        Ok(())
    }
}
