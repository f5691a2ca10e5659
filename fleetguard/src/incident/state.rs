//! Incident lifecycle state machine.
//!
//! Transitions are monotonic along the main path
//! `Triggered → Processing → Dispatched → Acknowledged → Responding →
//! Resolved`, with `Escalated` as a side branch reachable while the
//! incident is still unresolved and `FalseAlarm` as a terminal manual
//! override from any non-terminal state. Once a terminal state is reached
//! no further transition is permitted.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle state of an incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    /// Accepted by intake, waiting in the priority queue.
    Triggered,
    /// Dequeued, dispatch sub-tasks in flight.
    Processing,
    /// All dispatch sub-tasks settled.
    Dispatched,
    /// An operator confirmed receipt.
    Acknowledged,
    /// A real-world response is underway.
    Responding,
    /// Closed with a real response.
    Resolved,
    /// Timed out at one or more escalation thresholds without acknowledgment.
    Escalated,
    /// Closed as a false alarm by manual override.
    FalseAlarm,
}

impl IncidentState {
    /// True for states that permit no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::FalseAlarm)
    }

    /// True for states in which the incident has not yet been acknowledged
    /// and the escalation monitor still watches it.
    pub fn is_awaiting_ack(&self) -> bool {
        matches!(
            self,
            Self::Triggered | Self::Processing | Self::Dispatched | Self::Escalated
        )
    }

    /// String form used in bus payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triggered => "triggered",
            Self::Processing => "processing",
            Self::Dispatched => "dispatched",
            Self::Acknowledged => "acknowledged",
            Self::Responding => "responding",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
            Self::FalseAlarm => "false_alarm",
        }
    }

    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition(&self, next: IncidentState) -> bool {
        use IncidentState::*;

        if self.is_terminal() {
            return false;
        }
        match next {
            // Manual override is allowed from any non-terminal state.
            FalseAlarm => true,
            // Resolution is allowed from any non-terminal state: an operator
            // may close an incident that was never formally acknowledged.
            Resolved => true,
            Processing => matches!(self, Triggered),
            Dispatched => matches!(self, Processing),
            Acknowledged => self.is_awaiting_ack(),
            Responding => matches!(self, Acknowledged),
            Escalated => matches!(self, Dispatched | Acknowledged | Escalated | Triggered | Processing),
            Triggered => false,
        }
    }

    /// Validates a transition, returning a [`StateError`] when illegal.
    pub fn transition(&self, id: Uuid, next: IncidentState) -> Result<IncidentState, StateError> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(StateError::InvalidTransition {
                id,
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for IncidentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by illegal lifecycle transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The requested transition is not permitted from the current state.
    #[error("incident {id}: illegal transition {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: IncidentState,
        to: IncidentState,
    },
}
