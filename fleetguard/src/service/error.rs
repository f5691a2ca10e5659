//! Service error taxonomy.
//!
//! Only intake-time failures surface to callers: validation rejections,
//! illegal lifecycle transitions, store failures, and intake saturation.
//! Everything that fails after a submission is accepted is logged, counted
//! in metrics, and published on the failure topic instead; a caller that
//! already received success is never thrown back into.

use crate::escalation::EscalationError;
use crate::incident::{StateError, ValidationError};
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the service API.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The submission was malformed; nothing was persisted or enqueued.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The requested lifecycle transition is illegal.
    #[error(transparent)]
    State(#[from] StateError),

    /// Manual escalation could not proceed.
    #[error(transparent)]
    Escalation(#[from] EscalationError),

    /// The store rejected or could not serve the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The intake channel is full; the submission was persisted but could
    /// not be queued.
    #[error("intake is saturated; incident persisted but not queued")]
    Saturated,

    /// The engine is no longer running.
    #[error("incident engine is not running")]
    EngineStopped,
}
