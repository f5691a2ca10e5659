//! Dispatch orchestration.
//!
//! For each dequeued incident the orchestrator runs three sub-tasks
//! concurrently and waits for all of them to settle; none blocks or
//! cancels the others:
//!
//! 1. external emergency-service dispatch through the gateway
//! 2. internal ops-alert materialisation for the propagation engine
//! 3. driver operating-status flip, when a driver is involved
//!
//! A failed external integration never blocks internal alerting; failures
//! are recorded as a [`DispatchPartialFailure`], published on the failure
//! topic, and queued on the dead-letter channel for manual intervention.

mod alert;
mod orchestrator;

pub use alert::OpsAlert;
pub use orchestrator::{
    DeadLetter, DispatchOrchestrator, DispatchOutcome, DispatchPartialFailure,
};
