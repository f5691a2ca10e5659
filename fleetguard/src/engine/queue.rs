//! Priority queue for pending incidents.
//!
//! Ordering: `critical > high > medium > low`, ties broken by arrival
//! order, so a newly triggered alert never overtakes an older one of the
//! same priority. Queue depth is expected to stay in the low tens; ordering
//! correctness matters far more than insert cost.

use crate::incident::Incident;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A queued incident with its arrival sequence number.
struct PendingIncident {
    incident: Incident,
    /// Monotonic arrival sequence for FIFO ordering within a priority band.
    sequence: u64,
}

impl PartialEq for PendingIncident {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingIncident {}

impl PartialOrd for PendingIncident {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingIncident {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then lower sequence (older) first.
        self.incident
            .priority
            .cmp(&other.incident.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Priority-ordered queue of pending incidents.
#[derive(Default)]
pub struct IncidentQueue {
    heap: BinaryHeap<PendingIncident>,
    next_sequence: u64,
}

impl IncidentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an incident at its priority position.
    pub fn push(&mut self, incident: Incident) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(PendingIncident { incident, sequence });
    }

    /// Removes the highest-priority, oldest incident.
    pub fn pop(&mut self) -> Option<Incident> {
        self.heap.pop().map(|pending| pending.incident)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
