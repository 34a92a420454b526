//! End-to-end ranking run: load the snapshot, seed it from the paper list,
//! enrich what is pending, then assemble and rank.

use crate::enrichment::{
    assemble, EnrichmentScheduler, EnrichmentSummary, ProgressObserver, RecordStore,
    SnapshotBackend, SnapshotKey,
};
use crate::orchestration::{log_event, EventType, RunLog};
use crate::papers::{PaperList, Venue};
use crate::ranking::{rank, CitationWindow, RankedRow};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::json;

/// What to rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingRequest {
    pub venue: Venue,
    pub year: i32,
    pub month: Option<u32>,
}

impl RankingRequest {
    pub fn snapshot_key(&self) -> SnapshotKey {
        SnapshotKey::new(self.venue.name(), self.year)
    }
}

pub struct RankingOutcome {
    pub key: SnapshotKey,
    pub summary: EnrichmentSummary,
    pub rows: Vec<RankedRow>,
    pub window: CitationWindow,
}

pub struct RankingPipeline {
    scheduler: EnrichmentScheduler,
    log: Option<RunLog>,
}

impl RankingPipeline {
    pub fn new(scheduler: EnrichmentScheduler) -> Self {
        Self {
            scheduler,
            log: None,
        }
    }

    pub fn with_log(mut self, log: RunLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Runs enrichment for `request` against `backend` and ranks the result.
    ///
    /// The window is validated before any lookup starts. Re-running after an
    /// interruption only looks up titles the last flush had not resolved.
    pub fn run(
        &self,
        request: &RankingRequest,
        papers: &PaperList,
        backend: Box<dyn SnapshotBackend>,
        observer: &mut dyn ProgressObserver,
        today: NaiveDate,
    ) -> Result<RankingOutcome> {
        let window = CitationWindow::new(request.year, request.month, today)?;
        let key = request.snapshot_key();
        let mut store = RecordStore::load(key.clone(), backend)
            .with_context(|| format!("Unable to load the {key} snapshot"))?;
        store.seed(papers);

        let pending = store.pending().len();
        if pending == 0 {
            self.record(&key, EventType::EnrichmentSkipped, json!({ "total": store.seeded_len() }))?;
        } else {
            self.record(
                &key,
                EventType::EnrichmentStarted,
                json!({ "total": store.seeded_len(), "pending": pending }),
            )?;
        }

        let summary = match self.scheduler.run(&mut store, observer) {
            Ok(summary) => summary,
            Err(err) => {
                self.record(&key, EventType::EnrichmentFailed, json!({ "error": err.to_string() }))?;
                return Err(err).with_context(|| format!("Enrichment of {key} failed"));
            }
        };
        if summary.dispatched > 0 {
            self.record(
                &key,
                EventType::EnrichmentCompleted,
                json!({
                    "resolved": summary.resolved,
                    "not_found": summary.not_found,
                    "skipped": summary.skipped,
                    "flushes": summary.flushes,
                    "duration_ms": summary.duration_ms
                }),
            )?;
        }

        let rows = assemble(papers.titles(), &store)?;
        Ok(RankingOutcome {
            key,
            summary,
            rows: rank(rows, &window),
            window,
        })
    }

    /// Logs the CSV export of an outcome.
    pub fn record_export(&self, outcome: &RankingOutcome, path: &std::path::Path) -> Result<()> {
        self.record(
            &outcome.key,
            EventType::RankingExported,
            json!({ "path": path, "rows": outcome.rows.len() }),
        )
    }

    fn record(&self, key: &SnapshotKey, event_type: EventType, details: serde_json::Value) -> Result<()> {
        match &self.log {
            Some(log) => log_event(log, key, event_type, details),
            None => Ok(()),
        }
    }
}
