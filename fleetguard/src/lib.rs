//! Fleetguard - incident intake, processing-queue, and propagation engine.
//!
//! Fleetguard turns a raw distress signal into a dispatched real-world
//! emergency response and a propagated notification to every relevant
//! operator: validate, enqueue by priority, dispatch concurrently to
//! external responders and internal channels, fan notifications out with
//! bounded concurrency, and escalate unacknowledged incidents on a timed
//! ladder.
//!
//! # High-Level API
//!
//! The [`service`] module provides the wired facade:
//!
//! ```ignore
//! use fleetguard::config::ConfigFile;
//! use fleetguard::service::{Collaborators, IncidentService};
//!
//! let service = IncidentService::start(ConfigFile::default(), Collaborators::local());
//!
//! let incident = service.trigger_incident(submission).await?;
//! service.acknowledge(incident.id, "op-7", None).await?;
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod escalation;
pub mod external;
pub mod incident;
pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

/// Version of the fleetguard library and CLI.
///
/// Synchronized across all components in the workspace; defined in
/// `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
