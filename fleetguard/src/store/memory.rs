//! In-memory incident store.
//!
//! A write-through cache over an optional durable journal. The map's
//! per-entry locking serializes concurrent updates to the same incident id;
//! a monotonically increasing version per record makes write ordering
//! observable.

use super::journal::Journal;
use super::{IncidentStore, IncidentUpdate, StoreError};
use crate::incident::{Incident, IncidentState};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A record plus its write version.
#[derive(Clone, Debug)]
struct Versioned {
    incident: Incident,
    version: u64,
}

/// DashMap-backed store, the default for a single-instance deployment.
#[derive(Default)]
pub struct InMemoryIncidentStore {
    records: DashMap<Uuid, Versioned>,
    journal: Option<Arc<dyn Journal>>,
}

impl InMemoryIncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a durable journal; every successful write is appended to it.
    pub fn with_journal(journal: Arc<dyn Journal>) -> Self {
        Self {
            records: DashMap::new(),
            journal: Some(journal),
        }
    }

    /// Write version of a record, for tests and diagnostics.
    pub fn version(&self, id: Uuid) -> Option<u64> {
        self.records.get(&id).map(|entry| entry.version)
    }

    fn journal_write(&self, incident: &Incident) {
        if let Some(journal) = &self.journal {
            journal.append(incident);
        }
    }
}

#[async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn save(&self, incident: Incident) -> Result<(), StoreError> {
        let id = incident.id;
        match self.records.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Conflict {
                id,
                reason: "incident already exists".to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                self.journal_write(&incident);
                slot.insert(Versioned {
                    incident,
                    version: 1,
                });
                Ok(())
            }
        }
    }

    async fn update(&self, id: Uuid, update: IncidentUpdate) -> Result<Incident, StoreError> {
        // The entry guard gives exclusive access for the read-modify-write.
        let mut entry = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        update.apply(&mut entry.incident)?;
        entry.version += 1;
        let updated = entry.incident.clone();
        drop(entry);

        self.journal_write(&updated);
        Ok(updated)
    }

    async fn get(&self, id: Uuid) -> Result<Incident, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.incident.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_active(&self) -> Result<Vec<Incident>, StoreError> {
        let mut active: Vec<Incident> = self
            .records
            .iter()
            .filter(|entry| !entry.incident.state.is_terminal())
            .map(|entry| entry.incident.clone())
            .collect();
        active.sort_by_key(|incident| incident.triggered_at);
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::IncidentPriority;
    use crate::testutil::incident as test_incident;

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let store = InMemoryIncidentStore::new();
        let incident = test_incident(IncidentPriority::High);
        let id = incident.id;

        store.save(incident).await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(store.version(id), Some(1));
    }

    #[tokio::test]
    async fn test_duplicate_save_rejected() {
        let store = InMemoryIncidentStore::new();
        let incident = test_incident(IncidentPriority::High);

        store.save(incident.clone()).await.unwrap();
        assert!(matches!(
            store.save(incident).await,
            Err(StoreError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryIncidentStore::new();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = InMemoryIncidentStore::new();
        let incident = test_incident(IncidentPriority::Medium);
        let id = incident.id;
        store.save(incident).await.unwrap();

        let updated = store
            .update(id, IncidentUpdate::to_state(IncidentState::Processing))
            .await
            .unwrap();
        assert_eq!(updated.state, IncidentState::Processing);
        assert_eq!(store.version(id), Some(2));
    }

    #[tokio::test]
    async fn test_list_active_excludes_terminal() {
        let store = InMemoryIncidentStore::new();
        let mut resolved = test_incident(IncidentPriority::Low);
        resolved.state = IncidentState::Resolved;
        let open = test_incident(IncidentPriority::Critical);
        let open_id = open.id;

        store.save(resolved).await.unwrap();
        store.save(open).await.unwrap();

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, open_id);
    }

    #[tokio::test]
    async fn test_concurrent_updates_all_applied() {
        let store = Arc::new(InMemoryIncidentStore::new());
        let incident = test_incident(IncidentPriority::Critical);
        let id = incident.id;
        store.save(incident).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let update = IncidentUpdate {
                    add_notified_operators: vec![format!("op-{i}")],
                    add_notification_attempts: 1,
                    ..Default::default()
                };
                store.update(id, update).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let incident = store.get(id).await.unwrap();
        assert_eq!(incident.notified_operators.len(), 16);
        assert_eq!(incident.notification_attempts, 16);
        assert_eq!(store.version(id), Some(17));
    }
}
