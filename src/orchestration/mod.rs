use crate::enrichment::SnapshotKey;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// Type of run events that can be logged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EnrichmentStarted,
    EnrichmentSkipped,
    EnrichmentCompleted,
    EnrichmentFailed,
    RankingExported,
}

/// Run event stored as JSONL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub event_id: Uuid,
    /// `<Venue>_<year>` of the run the event belongs to.
    pub run_key: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Append-only event log shared by every run in a workspace.
#[derive(Debug, Clone)]
pub struct RunLog {
    events_path: PathBuf,
}

impl RunLog {
    pub fn at(events_path: impl Into<PathBuf>) -> Self {
        Self {
            events_path: events_path.into(),
        }
    }

    pub fn append_event(&self, event: &RunEvent) -> Result<()> {
        if let Some(parent) = self.events_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .with_context(|| format!("Unable to open event log {:?}", self.events_path))?;
        file.write_all(serde_json::to_string(event)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn load_events(&self) -> Result<Vec<RunEvent>> {
        if !self.events_path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.events_path)
            .with_context(|| format!("Unable to read {:?}", self.events_path))?;
        let mut events = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            let event: RunEvent =
                serde_json::from_str(line).with_context(|| "Failed to parse run event record")?;
            events.push(event);
        }
        Ok(events)
    }

    pub fn events_for(&self, key: &SnapshotKey) -> Result<Vec<RunEvent>> {
        let run_key = run_key(key);
        Ok(self
            .load_events()?
            .into_iter()
            .filter(|event| event.run_key == run_key)
            .collect())
    }
}

/// Append a simple run event.
pub fn log_event(
    log: &RunLog,
    key: &SnapshotKey,
    event_type: EventType,
    details: serde_json::Value,
) -> Result<()> {
    let event = RunEvent {
        event_id: Uuid::new_v4(),
        run_key: run_key(key),
        event_type,
        timestamp: Utc::now(),
        details,
    };
    log.append_event(&event)
}

fn run_key(key: &SnapshotKey) -> String {
    format!("{}_{}", key.venue, key.year)
}
