//! High-level service facade.
//!
//! [`IncidentService`] is the produced interface of this crate: it wires the
//! validator, store, queue, orchestrator, propagation engine, escalation
//! monitor, and metrics system together from injected collaborators (no
//! hidden global state) and exposes the intake and lifecycle API.

mod error;
mod facade;

pub use error::ServiceError;
pub use facade::{Collaborators, IncidentService, RespondRequest, ResponseType};
