//! The canonical incident record and its classification types.

use super::state::IncidentState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Incident category, derived from the nature of the distress signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Medical,
    SecurityThreat,
    SevereAccident,
    Fire,
    NaturalDisaster,
    Abduction,
    DomesticViolence,
    General,
}

impl IncidentCategory {
    /// Short code fragment used in human-readable incident codes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Medical => "MED",
            Self::SecurityThreat => "SEC",
            Self::SevereAccident => "ACC",
            Self::Fire => "FIRE",
            Self::NaturalDisaster => "DIS",
            Self::Abduction => "ABD",
            Self::DomesticViolence => "DV",
            Self::General => "GEN",
        }
    }

    /// Base severity contribution of this category (1-6).
    fn base_severity(&self) -> u8 {
        match self {
            Self::Abduction => 6,
            Self::Medical | Self::Fire => 5,
            Self::SevereAccident | Self::DomesticViolence => 4,
            Self::SecurityThreat | Self::NaturalDisaster => 3,
            Self::General => 1,
        }
    }
}

impl FromStr for IncidentCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medical" | "medical_emergency" => Ok(Self::Medical),
            "security_threat" => Ok(Self::SecurityThreat),
            "severe_accident" | "accident" => Ok(Self::SevereAccident),
            "fire" => Ok(Self::Fire),
            "natural_disaster" => Ok(Self::NaturalDisaster),
            "abduction" => Ok(Self::Abduction),
            "domestic_violence" => Ok(Self::DomesticViolence),
            "general" => Ok(Self::General),
            _ => Err(()),
        }
    }
}

impl fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Medical => "medical",
            Self::SecurityThreat => "security_threat",
            Self::SevereAccident => "severe_accident",
            Self::Fire => "fire",
            Self::NaturalDisaster => "natural_disaster",
            Self::Abduction => "abduction",
            Self::DomesticViolence => "domestic_violence",
            Self::General => "general",
        };
        write!(f, "{}", name)
    }
}

/// Incident priority. Ordering is significant: `Critical` sorts above
/// `High`, which sorts above `Medium`, which sorts above `Low`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl IncidentPriority {
    /// Scheduling rank: higher value is dequeued first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 3,
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }

    /// Short code fragment used in human-readable incident codes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Critical => "CRIT",
            Self::High => "HIGH",
            Self::Medium => "MED",
            Self::Low => "LOW",
        }
    }

    /// Severity contribution of this priority (0-4).
    fn severity_boost(&self) -> u8 {
        match self {
            Self::Critical => 4,
            Self::High => 3,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }
}

impl PartialOrd for IncidentPriority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IncidentPriority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for IncidentPriority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(()),
        }
    }
}

impl fmt::Display for IncidentPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{}", name)
    }
}

/// Who reported the incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReporterRole {
    Driver,
    Passenger,
    Customer,
    Operator,
    System,
}

impl FromStr for ReporterRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driver" => Ok(Self::Driver),
            "passenger" => Ok(Self::Passenger),
            "customer" => Ok(Self::Customer),
            "operator" => Ok(Self::Operator),
            "system" => Ok(Self::System),
            _ => Err(()),
        }
    }
}

/// Reporter identity attached to an incident.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reporter {
    /// Stable identifier within the platform.
    pub id: String,
    /// Role of the reporter at trigger time.
    pub role: ReporterRole,
    /// Display name, when known.
    pub name: Option<String>,
    /// Contact number or address, when known.
    pub contact: Option<String>,
}

/// Geographic context of an incident.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, if the device reported one.
    pub accuracy_m: Option<f64>,
    /// Reverse-geocoded address, filled in by an external enricher.
    pub address: Option<String>,
}

/// Kind of evidence attached to an incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Photo,
    Audio,
    Video,
    Document,
}

/// A single evidence attachment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceAttachment {
    pub kind: EvidenceKind,
    pub url: String,
    /// Set once an operator has verified the attachment.
    pub verified: bool,
}

/// Record of one external emergency-service notification attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalNotification {
    /// Service name as reported by the gateway (e.g. "national", "medical").
    pub service: String,
    /// Last known status ("accepted", "pending", "failed").
    pub status: String,
    /// Reference number returned by the service, once available.
    pub reference: Option<String>,
}

/// The canonical record of one emergency/alert event.
///
/// Owned exclusively by the incident store. All timing fields required by
/// the performance contracts are carried here; `processing_ms` is stamped
/// exactly once, when dispatch completes, and never recomputed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Incident {
    // Identity
    pub id: Uuid,
    /// Human-readable short code, e.g. `MED-CRIT-20260807-153059`.
    pub code: String,
    /// Link to a pre-existing support case, if the incident was promoted.
    pub case_ref: Option<String>,

    // Classification
    pub category: IncidentCategory,
    pub priority: IncidentPriority,
    /// Numeric severity 1-10, derived from category and priority.
    pub severity: u8,

    // Origin
    pub reporter: Reporter,

    // Context
    pub location: Geolocation,
    pub region_id: String,
    pub trip_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub description: Option<String>,
    pub attachments: Vec<EvidenceAttachment>,
    /// Opaque forward-compatibility extension fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,

    // Lifecycle
    pub state: IncidentState,

    // Timing
    pub triggered_at: DateTime<Utc>,
    pub propagation_started_at: Option<DateTime<Utc>>,
    pub propagation_completed_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub responded_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Trigger-to-dispatched duration in milliseconds. Stamped once.
    pub processing_ms: Option<u64>,
    /// Trigger-to-acknowledged duration in milliseconds.
    pub response_ms: Option<u64>,

    // Escalation
    pub escalation_level: u8,
    pub escalated_at: Option<DateTime<Utc>>,
    pub escalated_to: Option<String>,
    pub external_notifications: Vec<ExternalNotification>,

    // Fan-out bookkeeping
    pub notified_operators: Vec<String>,
    pub notification_attempts: u32,
}

impl Incident {
    /// Derives the numeric severity (1-10) from category and priority.
    pub fn derive_severity(category: IncidentCategory, priority: IncidentPriority) -> u8 {
        (category.base_severity() + priority.severity_boost()).clamp(1, 10)
    }

    /// Derives the human-readable short code from classification and
    /// trigger time.
    pub fn derive_code(
        category: IncidentCategory,
        priority: IncidentPriority,
        triggered_at: DateTime<Utc>,
    ) -> String {
        format!(
            "{}-{}-{}",
            category.code(),
            priority.code(),
            triggered_at.format("%Y%m%d-%H%M%S")
        )
    }

    /// True once the incident can no longer be mutated.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_priority_ordering() {
        assert!(IncidentPriority::Critical > IncidentPriority::High);
        assert!(IncidentPriority::High > IncidentPriority::Medium);
        assert!(IncidentPriority::Medium > IncidentPriority::Low);
    }

    #[test]
    fn test_severity_bounds() {
        for category in [
            IncidentCategory::Medical,
            IncidentCategory::SecurityThreat,
            IncidentCategory::SevereAccident,
            IncidentCategory::Fire,
            IncidentCategory::NaturalDisaster,
            IncidentCategory::Abduction,
            IncidentCategory::DomesticViolence,
            IncidentCategory::General,
        ] {
            for priority in [
                IncidentPriority::Critical,
                IncidentPriority::High,
                IncidentPriority::Medium,
                IncidentPriority::Low,
            ] {
                let severity = Incident::derive_severity(category, priority);
                assert!((1..=10).contains(&severity));
            }
        }
    }

    #[test]
    fn test_severity_follows_priority() {
        let critical =
            Incident::derive_severity(IncidentCategory::Medical, IncidentPriority::Critical);
        let low = Incident::derive_severity(IncidentCategory::Medical, IncidentPriority::Low);
        assert!(critical > low);
    }

    #[test]
    fn test_abduction_critical_is_max_severity() {
        let severity =
            Incident::derive_severity(IncidentCategory::Abduction, IncidentPriority::Critical);
        assert_eq!(severity, 10);
    }

    #[test]
    fn test_code_derivation() {
        let at = Utc.with_ymd_and_hms(2026, 8, 7, 15, 30, 59).unwrap();
        let code = Incident::derive_code(IncidentCategory::Medical, IncidentPriority::Critical, at);
        assert_eq!(code, "MED-CRIT-20260807-153059");
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "medical_emergency".parse::<IncidentCategory>(),
            Ok(IncidentCategory::Medical)
        );
        assert_eq!("fire".parse::<IncidentCategory>(), Ok(IncidentCategory::Fire));
        assert!("earthquake_drill".parse::<IncidentCategory>().is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("driver".parse::<ReporterRole>(), Ok(ReporterRole::Driver));
        assert!("bystander".parse::<ReporterRole>().is_err());
    }

    #[test]
    fn test_incident_serde_round_trip() {
        let incident = Incident {
            id: Uuid::new_v4(),
            code: "GEN-LOW-20260807-000000".to_string(),
            case_ref: None,
            category: IncidentCategory::General,
            priority: IncidentPriority::Low,
            severity: 1,
            reporter: Reporter {
                id: "rider-1".to_string(),
                role: ReporterRole::Passenger,
                name: None,
                contact: None,
            },
            location: Geolocation {
                latitude: 14.5995,
                longitude: 121.0308,
                accuracy_m: Some(12.0),
                address: None,
            },
            region_id: "mnl".to_string(),
            trip_id: None,
            vehicle_id: None,
            driver_id: None,
            description: None,
            attachments: Vec::new(),
            extensions: BTreeMap::new(),
            state: IncidentState::Triggered,
            triggered_at: Utc::now(),
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
        };

        let json = serde_json::to_string(&incident).unwrap();
        let back: Incident = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, incident.id);
        assert_eq!(back.priority, incident.priority);
        assert_eq!(back.state, IncidentState::Triggered);
    }
}
