//! Operator directory boundary.
//!
//! Target resolution is a single filtered, rank-ordered query against the
//! directory, never an in-memory filter over all operators. The incident's
//! priority maps to a minimum priority weight; lower thresholds reach wider
//! and more senior operator sets.

use super::channels::NotifyChannel;
use crate::incident::IncidentPriority;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operator role within the operations organisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorRole {
    Dispatcher,
    Supervisor,
    Manager,
    Security,
}

/// One operator who must be told about an incident.
///
/// Ephemeral: resolved per incident, never persisted by this engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub operator_id: String,
    pub role: OperatorRole,
    /// `None` marks a global role reached regardless of region.
    pub region_id: Option<String>,
    /// Preferred channels in order; push is always implied.
    pub channels: Vec<NotifyChannel>,
    /// Duty breadth, 0-9. Operators at or above the queried minimum are
    /// included; senior roles carry higher weights.
    pub priority_weight: u8,
    pub on_duty: bool,
    pub last_active: Option<DateTime<Utc>>,
}

/// Minimum priority weight reached by each incident priority.
///
/// Critical incidents reach the widest set (threshold 0); low-priority
/// incidents reach only the narrower high-weight set.
pub fn min_rank_for(priority: IncidentPriority) -> u8 {
    match priority {
        IncidentPriority::Critical => 0,
        IncidentPriority::High => 2,
        IncidentPriority::Medium => 4,
        IncidentPriority::Low => 6,
    }
}

/// Errors resolving notification targets.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("operator directory query failed: {0}")]
    Query(String),
}

/// The operator directory.
#[async_trait]
pub trait OperatorDirectory: Send + Sync {
    /// Resolves the on-duty, subscribed operators for a region at or above
    /// the given minimum priority weight, ordered most-senior first.
    async fn resolve_targets(
        &self,
        region_id: &str,
        min_rank: u8,
    ) -> Result<Vec<NotificationTarget>, DirectoryError>;
}

/// Directory backed by a fixed operator roster.
///
/// Default wiring for a single-node deployment; tests use it to model
/// arbitrary rosters.
pub struct StaticDirectory {
    operators: Vec<NotificationTarget>,
}

impl StaticDirectory {
    pub fn new(operators: Vec<NotificationTarget>) -> Self {
        Self { operators }
    }
}

#[async_trait]
impl OperatorDirectory for StaticDirectory {
    async fn resolve_targets(
        &self,
        region_id: &str,
        min_rank: u8,
    ) -> Result<Vec<NotificationTarget>, DirectoryError> {
        let mut targets: Vec<NotificationTarget> = self
            .operators
            .iter()
            .filter(|op| op.on_duty)
            .filter(|op| op.priority_weight >= min_rank)
            .filter(|op| match &op.region_id {
                Some(region) => region == region_id,
                None => true,
            })
            .cloned()
            .collect();
        targets.sort_by(|a, b| b.priority_weight.cmp(&a.priority_weight));
        Ok(targets)
    }
}
