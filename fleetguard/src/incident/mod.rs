//! Incident domain model.
//!
//! The [`Incident`] is the canonical record of one emergency event. It is
//! owned exclusively by the incident store; every other component refers to
//! it by id and mutates it only through the store's update contract.
//!
//! Submodules:
//! - [`model`]: the record itself plus classification enums
//! - [`state`]: the lifecycle state machine and transition validation
//! - [`submission`]: raw intake payloads and validation

mod model;
mod state;
mod submission;

pub use model::{
    EvidenceAttachment, EvidenceKind, ExternalNotification, Geolocation, Incident,
    IncidentCategory, IncidentPriority, Reporter, ReporterRole,
};
pub use state::{IncidentState, StateError};
pub use submission::{validate, IncidentSubmission, NormalizedSubmission, ValidationError};
