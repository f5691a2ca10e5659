//! Emergency-services gateway boundary.
//!
//! The gateway accepts a standardized request and forwards it to real-world
//! responders. Which services are required is a fixed mapping from the
//! incident category; each service acknowledges (or fails) independently.

use crate::incident::{Incident, IncidentCategory, IncidentPriority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// A real-world emergency service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// National emergency hotline; requested for every category.
    National,
    Medical,
    Fire,
    Police,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::Medical => "medical",
            Self::Fire => "fire",
            Self::Police => "police",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed category → required-services mapping.
pub fn required_services(category: IncidentCategory) -> &'static [ServiceKind] {
    use ServiceKind::*;
    match category {
        IncidentCategory::Medical => &[National, Medical],
        IncidentCategory::Fire => &[National, Fire],
        IncidentCategory::SevereAccident => &[National, Medical],
        IncidentCategory::SecurityThreat => &[National, Police],
        IncidentCategory::Abduction => &[National, Police],
        IncidentCategory::DomesticViolence => &[National, Police],
        IncidentCategory::NaturalDisaster => &[National, Fire],
        IncidentCategory::General => &[National],
    }
}

/// Standardized request sent to the gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmergencyServiceRequest {
    pub incident_id: Uuid,
    pub code: String,
    pub category: IncidentCategory,
    pub priority: IncidentPriority,
    pub severity: u8,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub region_id: String,
    pub description: Option<String>,
    pub reporter_contact: Option<String>,
    pub services: Vec<ServiceKind>,
}

impl EmergencyServiceRequest {
    /// Builds the request for an incident, deriving the required services
    /// from its category.
    pub fn for_incident(incident: &Incident) -> Self {
        Self {
            incident_id: incident.id,
            code: incident.code.clone(),
            category: incident.category,
            priority: incident.priority,
            severity: incident.severity,
            latitude: incident.location.latitude,
            longitude: incident.location.longitude,
            address: incident.location.address.clone(),
            region_id: incident.region_id.clone(),
            description: incident.description.clone(),
            reporter_contact: incident.reporter.contact.clone(),
            services: required_services(incident.category).to_vec(),
        }
    }
}

/// Per-service dispatch outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Accepted,
    Pending,
    Failed,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }
}

/// One service's response to a dispatch request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceDispatch {
    pub service: ServiceKind,
    pub status: DispatchStatus,
    pub reference: Option<String>,
}

/// Errors from the gateway call as a whole.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("emergency gateway unreachable: {0}")]
    Unreachable(String),

    #[error("emergency gateway rejected request: {0}")]
    Rejected(String),
}

/// The external emergency-services integration.
#[async_trait]
pub trait EmergencyGateway: Send + Sync {
    /// Requests real-world dispatch. Individual services may fail
    /// independently; a `Failed` entry is not a call-level error.
    async fn dispatch(
        &self,
        request: &EmergencyServiceRequest,
    ) -> Result<Vec<ServiceDispatch>, GatewayError>;
}

/// Gateway that records the request in the log and acknowledges every
/// service with a locally generated reference. Default local wiring.
pub struct LogGateway;

#[async_trait]
impl EmergencyGateway for LogGateway {
    async fn dispatch(
        &self,
        request: &EmergencyServiceRequest,
    ) -> Result<Vec<ServiceDispatch>, GatewayError> {
        info!(
            incident_id = %request.incident_id,
            code = %request.code,
            services = ?request.services,
            "Emergency dispatch requested"
        );
        Ok(request
            .services
            .iter()
            .map(|service| ServiceDispatch {
                service: *service,
                status: DispatchStatus::Accepted,
                reference: Some(format!("LOC-{}-{}", service.as_str(), request.code)),
            })
            .collect())
    }
}
