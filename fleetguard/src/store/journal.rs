//! Durable incident journal.
//!
//! The journal is the durable half of the store's write-through pair: every
//! accepted write is appended as one JSON line. Appends are best-effort from
//! the pipeline's point of view: a journal failure is logged, never allowed
//! to fail the life-safety write path.

use crate::incident::Incident;
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

/// Sink for durable incident snapshots.
pub trait Journal: Send + Sync {
    /// Appends one incident snapshot. Must not panic.
    fn append(&self, incident: &Incident);
}

/// One journal line.
#[derive(Serialize)]
struct JournalEntry<'a> {
    at: chrono::DateTime<Utc>,
    incident: &'a Incident,
}

/// Append-only JSON-lines journal file.
pub struct JsonlJournal {
    file: Mutex<File>,
}

impl JsonlJournal {
    /// Opens (or creates) the journal file in append mode.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl Journal for JsonlJournal {
    fn append(&self, incident: &Incident) {
        let entry = JournalEntry {
            at: Utc::now(),
            incident,
        };
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(error) => {
                warn!(incident_id = %incident.id, %error, "Journal serialization failed");
                return;
            }
        };

        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(error) = writeln!(file, "{}", line) {
            warn!(incident_id = %incident.id, %error, "Journal append failed");
        }
    }
}
