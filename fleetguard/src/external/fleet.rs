//! Fleet directory boundary: driver operating-status flips.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Operating status of a driver in the fleet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverOperatingStatus {
    Normal,
    /// The driver is party to an active incident; matching and routing
    /// treat the vehicle as unavailable.
    Emergency,
}

impl DriverOperatingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for DriverOperatingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors updating driver status.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("driver {0} not found")]
    UnknownDriver(String),

    #[error("fleet directory unavailable: {0}")]
    Unavailable(String),
}

/// The fleet's driver registry.
#[async_trait]
pub trait FleetDirectory: Send + Sync {
    /// Sets a driver's operating status.
    async fn set_driver_status(
        &self,
        driver_id: &str,
        status: DriverOperatingStatus,
    ) -> Result<(), FleetError>;
}

/// Fleet directory that records status flips in the log. Default local
/// wiring.
pub struct LogFleetDirectory;

#[async_trait]
impl FleetDirectory for LogFleetDirectory {
    async fn set_driver_status(
        &self,
        driver_id: &str,
        status: DriverOperatingStatus,
    ) -> Result<(), FleetError> {
        info!(driver_id, status = status.as_str(), "Driver status changed");
        Ok(())
    }
}
