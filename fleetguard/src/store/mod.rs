//! Incident store: the single owner of mutable incident state.
//!
//! Every mutation in the pipeline funnels through [`IncidentStore::update`]
//! with a typed partial [`IncidentUpdate`]. The store serializes concurrent
//! updates to the same incident id, validates lifecycle transitions while
//! holding the record, and rejects any mutation of a terminal record, so a
//! dispatch-stage write and an acknowledge-stage write can never silently
//! lose one another.
//!
//! Implementations must guarantee read-after-write consistency for the
//! instance that wrote.

mod journal;
mod memory;

pub use journal::{Journal, JsonlJournal};
pub use memory::InMemoryIncidentStore;

use crate::incident::{ExternalNotification, Incident, IncidentState, StateError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("incident {0} not found")]
    NotFound(Uuid),

    /// The record is in a terminal state; terminal records are immutable.
    #[error("incident {0} is terminal and cannot be mutated")]
    Terminal(Uuid),

    /// The update requested an illegal lifecycle transition.
    #[error(transparent)]
    State(#[from] StateError),

    /// A guarded update observed a different record than it expected.
    #[error("incident {id} update conflict: {reason}")]
    Conflict { id: Uuid, reason: String },

    /// The backing store cannot currently serve the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Typed partial update applied atomically to one incident.
///
/// Only fields that are `Some` (or non-empty, for the append lists) are
/// applied. `state` is validated against the lifecycle machine while the
/// record is held, so illegal transitions are rejected atomically.
#[derive(Clone, Debug, Default)]
pub struct IncidentUpdate {
    /// Requested lifecycle transition.
    pub state: Option<IncidentState>,
    /// Guard: apply only when the record's escalation level still matches.
    pub expected_level: Option<u8>,

    /// Trigger-to-dispatched duration. Set-once: ignored when already stamped.
    pub processing_ms: Option<u64>,
    pub response_ms: Option<u64>,

    pub propagation_started_at: Option<DateTime<Utc>>,
    pub propagation_completed_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub responded_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,

    pub escalation_level: Option<u8>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub escalated_to: Option<String>,

    pub add_external_notifications: Vec<ExternalNotification>,
    pub add_notified_operators: Vec<String>,
    pub add_notification_attempts: u32,
}

impl IncidentUpdate {
    /// Update requesting only a lifecycle transition.
    pub fn to_state(state: IncidentState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    /// Applies this update to a record, enforcing immutability and
    /// transition rules. The caller must hold exclusive access to the
    /// record for the duration.
    pub fn apply(&self, incident: &mut Incident) -> Result<(), StoreError> {
        if incident.is_terminal() {
            return Err(StoreError::Terminal(incident.id));
        }
        if let Some(expected) = self.expected_level {
            if incident.escalation_level != expected {
                return Err(StoreError::Conflict {
                    id: incident.id,
                    reason: format!(
                        "expected escalation level {}, found {}",
                        expected, incident.escalation_level
                    ),
                });
            }
        }
        if let Some(next) = self.state {
            incident.state = incident.state.transition(incident.id, next)?;
        }

        if incident.processing_ms.is_none() {
            if let Some(ms) = self.processing_ms {
                incident.processing_ms = Some(ms);
            }
        }
        if let Some(ms) = self.response_ms {
            incident.response_ms = Some(ms);
        }

        macro_rules! set_if_some {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field.clone() {
                    incident.$field = Some(value);
                })*
            };
        }
        set_if_some!(
            propagation_started_at,
            propagation_completed_at,
            acknowledged_at,
            acknowledged_by,
            responded_at,
            responded_by,
            resolved_at,
            escalated_at,
            escalated_to
        );

        if let Some(level) = self.escalation_level {
            incident.escalation_level = level;
        }

        incident
            .external_notifications
            .extend(self.add_external_notifications.iter().cloned());
        for operator in &self.add_notified_operators {
            if !incident.notified_operators.contains(operator) {
                incident.notified_operators.push(operator.clone());
            }
        }
        incident.notification_attempts += self.add_notification_attempts;

        Ok(())
    }
}

/// Canonical storage for incidents.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Persists a new incident. Fails on duplicate id.
    async fn save(&self, incident: Incident) -> Result<(), StoreError>;

    /// Applies a partial update atomically and returns the updated record.
    async fn update(&self, id: Uuid, update: IncidentUpdate) -> Result<Incident, StoreError>;

    /// Fetches one incident.
    async fn get(&self, id: Uuid) -> Result<Incident, StoreError>;

    /// Lists every incident not yet in a terminal state.
    async fn list_active(&self) -> Result<Vec<Incident>, StoreError>;
}
