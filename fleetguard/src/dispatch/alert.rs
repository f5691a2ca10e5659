//! Internal ops alert.
//!
//! The alert is the internal record handed to operator-facing surfaces: it
//! carries the incident's classification and context without its mutable
//! lifecycle state, and is the payload of the ops-alert bus topic.

use crate::incident::{Geolocation, Incident, IncidentCategory, IncidentPriority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal alert entity materialised during dispatch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpsAlert {
    pub alert_id: Uuid,
    pub incident_id: Uuid,
    pub code: String,
    pub category: IncidentCategory,
    pub priority: IncidentPriority,
    pub severity: u8,
    pub region_id: String,
    pub location: Geolocation,
    pub driver_id: Option<String>,
    pub trip_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub description: Option<String>,
    pub triggered_at: DateTime<Utc>,
}

impl OpsAlert {
    /// Builds the alert for an incident.
    pub fn for_incident(incident: &Incident) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            incident_id: incident.id,
            code: incident.code.clone(),
            category: incident.category,
            priority: incident.priority,
            severity: incident.severity,
            region_id: incident.region_id.clone(),
            location: incident.location.clone(),
            driver_id: incident.driver_id.clone(),
            trip_id: incident.trip_id.clone(),
            vehicle_id: incident.vehicle_id.clone(),
            description: incident.description.clone(),
            triggered_at: incident.triggered_at,
        }
    }
}
