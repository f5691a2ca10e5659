//! Shared test fixtures.

use crate::incident::{
    Geolocation, Incident, IncidentCategory, IncidentPriority, IncidentState, Reporter,
    ReporterRole,
};
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A minimal triggered incident for tests.
pub(crate) fn incident(priority: IncidentPriority) -> Incident {
    incident_with_category(IncidentCategory::General, priority)
}

/// A minimal triggered incident with an explicit category.
pub(crate) fn incident_with_category(
    category: IncidentCategory,
    priority: IncidentPriority,
) -> Incident {
    let now = Utc::now();
    Incident {
        id: Uuid::new_v4(),
        code: Incident::derive_code(category, priority, now),
        case_ref: None,
        category,
        priority,
        severity: Incident::derive_severity(category, priority),
        reporter: Reporter {
            id: "reporter-1".to_string(),
            role: ReporterRole::Passenger,
            name: None,
            contact: None,
        },
        location: Geolocation {
            latitude: 0.0,
            longitude: 0.0,
            accuracy_m: None,
            address: None,
        },
        region_id: "global".to_string(),
        trip_id: None,
        vehicle_id: None,
        driver_id: None,
        description: None,
        attachments: Vec::new(),
        extensions: BTreeMap::new(),
        state: IncidentState::Triggered,
        triggered_at: now,
        propagation_started_at: None,
        propagation_completed_at: None,
        acknowledged_at: None,
        acknowledged_by: None,
        responded_at: None,
        responded_by: None,
        resolved_at: None,
        processing_ms: None,
        response_ms: None,
        escalation_level: 0,
        escalated_at: None,
        escalated_to: None,
        external_notifications: Vec::new(),
        notified_operators: Vec::new(),
        notification_attempts: 0,
    }
}
