use super::error::{EnrichmentError, EnrichmentResult};
use super::record::NOT_FOUND;
use super::resolver::{CitationResolver, Resolution};
use super::store::RecordStore;
use crate::workspace::EnrichmentSettings;
use crossbeam_channel::{unbounded, Receiver};
use rayon::ThreadPoolBuilder;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Receives progress as completions are applied to the store.
pub trait ProgressObserver {
    fn started(&mut self, _pending: usize, _total: usize) {}
    fn completed(&mut self, _done: usize, _pending: usize, _resolution: &Resolution) {}
    fn flushed(&mut self, _done: usize) {}
    fn finished(&mut self, _summary: &EnrichmentSummary) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {}

/// Counts for one scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Seeded titles plus unseeded records that were still pending.
    pub total: usize,
    /// Titles already resolved before this run.
    pub skipped: usize,
    /// Titles dispatched this run.
    pub dispatched: usize,
    pub resolved: usize,
    /// Resolved this run with the not-found sentinel.
    pub not_found: usize,
    pub flushes: usize,
    pub duration_ms: u64,
}

enum WorkerMessage {
    Done(Resolution),
    Crashed { title: String, reason: String },
}

/// Fans pending titles out to a fixed-size pool and folds completions back
/// into the store in arrival order.
pub struct EnrichmentScheduler {
    resolver: Arc<dyn CitationResolver>,
    concurrency: usize,
    flush_every: usize,
}

impl EnrichmentScheduler {
    pub fn new(resolver: Arc<dyn CitationResolver>, settings: &EnrichmentSettings) -> Self {
        Self {
            resolver,
            concurrency: settings.concurrency(),
            flush_every: settings.flush_every(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_flush_every(mut self, flush_every: usize) -> Self {
        self.flush_every = flush_every.max(1);
        self
    }

    /// Resolves every pending title in `store`.
    ///
    /// The store is flushed each time the completed count reaches a multiple
    /// of `flush_every`, and once more after the pool drains. A worker that
    /// dies without reporting aborts the run with `Scheduler` after the final
    /// flush, so everything that did complete stays resumable.
    pub fn run(
        &self,
        store: &mut RecordStore,
        observer: &mut dyn ProgressObserver,
    ) -> EnrichmentResult<EnrichmentSummary> {
        let started = Instant::now();
        let work = store.pending();
        let total = store.tracked_len();
        let mut summary = EnrichmentSummary {
            total,
            skipped: total.saturating_sub(work.len()),
            dispatched: work.len(),
            ..EnrichmentSummary::default()
        };
        observer.started(work.len(), total);
        if work.is_empty() {
            info!(run = %store.key(), total, "Nothing pending, skipping enrichment");
            observer.finished(&summary);
            return Ok(summary);
        }

        let pool = match ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|idx| format!("citerank-worker-{idx}"))
            .build()
        {
            Ok(pool) => pool,
            Err(err) => {
                observer.finished(&summary);
                return Err(EnrichmentError::Scheduler(format!(
                    "cannot start worker pool: {err}"
                )));
            }
        };
        info!(
            run = %store.key(),
            pending = work.len(),
            skipped = summary.skipped,
            workers = self.concurrency,
            "Dispatching citation lookups"
        );

        let (tx, rx) = unbounded();
        for title in work.iter().cloned() {
            let tx = tx.clone();
            let resolver = Arc::clone(&self.resolver);
            pool.spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| resolver.resolve(&title)));
                let message = match outcome {
                    Ok(resolution) => WorkerMessage::Done(resolution),
                    Err(payload) => WorkerMessage::Crashed {
                        title,
                        reason: panic_reason(payload.as_ref()),
                    },
                };
                // The coordinator only hangs up after an unknown-title abort.
                let _ = tx.send(message);
            });
        }
        drop(tx);

        let drained = self.drain(store, rx, work.len(), &mut summary, observer);
        summary.duration_ms = started.elapsed().as_millis() as u64;
        observer.finished(&summary);
        drained?;

        info!(
            run = %store.key(),
            resolved = summary.resolved,
            not_found = summary.not_found,
            flushes = summary.flushes,
            duration_ms = summary.duration_ms,
            "Enrichment finished"
        );
        Ok(summary)
    }

    /// Applies completions until every worker has hung up, then flushes once
    /// more and reports crashed or missing workers.
    fn drain(
        &self,
        store: &mut RecordStore,
        rx: Receiver<WorkerMessage>,
        expected: usize,
        summary: &mut EnrichmentSummary,
        observer: &mut dyn ProgressObserver,
    ) -> EnrichmentResult<()> {
        let mut crashed: Vec<String> = Vec::new();
        let mut received = 0usize;
        for message in rx.iter() {
            received += 1;
            let resolution = match message {
                WorkerMessage::Done(resolution) => resolution,
                WorkerMessage::Crashed { title, reason } => {
                    error!(title = %title, reason = %reason, "Citation worker crashed");
                    crashed.push(title);
                    continue;
                }
            };
            store.apply(&resolution.title, resolution.citations)?;
            summary.resolved += 1;
            if resolution.citations == NOT_FOUND {
                summary.not_found += 1;
            }
            debug!(title = %resolution.title, citations = resolution.citations, "Applied citation count");
            observer.completed(summary.resolved, expected, &resolution);

            if summary.resolved % self.flush_every == 0 {
                store.flush()?;
                summary.flushes += 1;
                observer.flushed(summary.resolved);
            }
        }

        store.flush()?;
        summary.flushes += 1;
        observer.flushed(summary.resolved);

        if let Some(first) = crashed.first() {
            return Err(EnrichmentError::Scheduler(format!(
                "{} worker(s) crashed; first failing title: {first:?}",
                crashed.len()
            )));
        }
        if received != expected {
            return Err(EnrichmentError::Scheduler(format!(
                "worker pool returned {received} of {expected} results"
            )));
        }
        Ok(())
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".into()
    }
}
