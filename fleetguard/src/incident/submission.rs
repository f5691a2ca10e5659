//! Intake submissions and validation.
//!
//! A raw [`IncidentSubmission`] is what callers hand to the pipeline: role
//! and category arrive as strings from the wire. Validation is a pure
//! function with no side effects: it either rejects the submission with a
//! [`ValidationError`] or produces a [`NormalizedSubmission`] with typed
//! classification fields, before anything touches the store or queue.

use super::model::{
    EvidenceAttachment, Geolocation, IncidentCategory, IncidentPriority, Reporter, ReporterRole,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Raw incident submission as received from a caller.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IncidentSubmission {
    pub reporter_id: String,
    /// Reporter role: one of `driver`, `passenger`, `customer`, `operator`,
    /// `system`.
    pub reporter_role: String,
    pub reporter_name: Option<String>,
    pub reporter_contact: Option<String>,

    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,

    /// Category name; defaults to `general` when omitted.
    pub category: Option<String>,
    /// Priority name; an omitted priority is treated as `critical`.
    pub priority: Option<String>,

    pub region_id: Option<String>,
    pub description: Option<String>,
    pub trip_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub case_ref: Option<String>,
    pub attachments: Vec<EvidenceAttachment>,
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

/// A submission that passed validation, with typed classification.
#[derive(Clone, Debug)]
pub struct NormalizedSubmission {
    pub reporter: Reporter,
    pub location: Geolocation,
    pub category: IncidentCategory,
    pub priority: IncidentPriority,
    pub region_id: String,
    pub description: Option<String>,
    pub trip_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub case_ref: Option<String>,
    pub attachments: Vec<EvidenceAttachment>,
    pub extensions: BTreeMap<String, String>,
}

/// Errors rejecting a malformed submission before it enters the pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("reporter id is required")]
    MissingReporterId,

    #[error("unknown reporter role '{0}'")]
    InvalidReporterRole(String),

    #[error("latitude {0} outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} outside [-180, 180]")]
    InvalidLongitude(f64),

    #[error("unknown incident category '{0}'")]
    UnknownCategory(String),

    #[error("unknown incident priority '{0}'")]
    UnknownPriority(String),
}

/// Region used when a submission carries none.
const DEFAULT_REGION: &str = "global";

/// Validates and normalizes a raw submission.
///
/// Pure function: no store or queue access, safe to call concurrently.
pub fn validate(submission: &IncidentSubmission) -> Result<NormalizedSubmission, ValidationError> {
    let reporter_id = submission.reporter_id.trim();
    if reporter_id.is_empty() {
        return Err(ValidationError::MissingReporterId);
    }

    let role: ReporterRole = submission
        .reporter_role
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidReporterRole(submission.reporter_role.clone()))?;

    if !(-90.0..=90.0).contains(&submission.latitude) || submission.latitude.is_nan() {
        return Err(ValidationError::InvalidLatitude(submission.latitude));
    }
    if !(-180.0..=180.0).contains(&submission.longitude) || submission.longitude.is_nan() {
        return Err(ValidationError::InvalidLongitude(submission.longitude));
    }

    let category = match submission.category.as_deref().map(str::trim) {
        None | Some("") => IncidentCategory::General,
        Some(raw) => raw
            .parse()
            .map_err(|_| ValidationError::UnknownCategory(raw.to_string()))?,
    };

    let priority = match submission.priority.as_deref().map(str::trim) {
        None | Some("") => IncidentPriority::Critical,
        Some(raw) => raw
            .parse()
            .map_err(|_| ValidationError::UnknownPriority(raw.to_string()))?,
    };

    let region_id = submission
        .region_id
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REGION)
        .to_string();

    Ok(NormalizedSubmission {
        reporter: Reporter {
            id: reporter_id.to_string(),
            role,
            name: submission.reporter_name.clone(),
            contact: submission.reporter_contact.clone(),
        },
        location: Geolocation {
            latitude: submission.latitude,
            longitude: submission.longitude,
            accuracy_m: submission.accuracy_m,
            address: None,
        },
        category,
        priority,
        region_id,
        description: submission.description.clone(),
        trip_id: submission.trip_id.clone(),
        vehicle_id: submission.vehicle_id.clone(),
        driver_id: submission.driver_id.clone(),
        case_ref: submission.case_ref.clone(),
        attachments: submission.attachments.clone(),
        extensions: submission.extensions.clone(),
    })
}
