use super::error::{EnrichmentError, EnrichmentResult};
use super::record::{EnrichmentRecord, PaperRow, SnapshotKey, NOT_FOUND};
use crate::papers::PaperList;
use atomic_write_file::AtomicWriteFile;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Durable storage for whole-store snapshots.
///
/// A write replaces the previous snapshot for the key in full; readers never
/// observe a partially written payload.
pub trait SnapshotBackend: Send {
    fn read(&self, key: &SnapshotKey) -> EnrichmentResult<Option<Vec<u8>>>;
    fn write(&self, key: &SnapshotKey, payload: &[u8]) -> EnrichmentResult<()>;
}

/// Keeps snapshots as JSON files in a directory, replaced atomically.
#[derive(Debug, Clone)]
pub struct FileSnapshotBackend {
    dir: PathBuf,
}

impl FileSnapshotBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &SnapshotKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl SnapshotBackend for FileSnapshotBackend {
    fn read(&self, key: &SnapshotKey) -> EnrichmentResult<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(EnrichmentError::snapshot(path, err)),
        }
    }

    fn write(&self, key: &SnapshotKey, payload: &[u8]) -> EnrichmentResult<()> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|err| EnrichmentError::snapshot(&self.dir, err))?;
        let mut file =
            AtomicWriteFile::open(&path).map_err(|err| EnrichmentError::snapshot(&path, err))?;
        file.write_all(payload)
            .map_err(|err| EnrichmentError::snapshot(&path, err))?;
        file.commit()
            .map_err(|err| EnrichmentError::snapshot(&path, err))?;
        Ok(())
    }
}

/// In-process backend for tests and dry runs. Clones share the same blobs.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotBackend {
    blobs: Arc<Mutex<HashMap<SnapshotKey, Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
}

impl MemorySnapshotBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes performed through any clone of this backend.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &SnapshotKey) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(key))
            .unwrap_or(false)
    }
}

impl SnapshotBackend for MemorySnapshotBackend {
    fn read(&self, key: &SnapshotKey) -> EnrichmentResult<Option<Vec<u8>>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| EnrichmentError::snapshot(key.file_name(), "memory backend poisoned"))?;
        Ok(blobs.get(key).cloned())
    }

    fn write(&self, key: &SnapshotKey, payload: &[u8]) -> EnrichmentResult<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| EnrichmentError::snapshot(key.file_name(), "memory backend poisoned"))?;
        blobs.insert(key.clone(), payload.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Title-keyed enrichment records for one (venue, year) run.
///
/// Only the coordinating thread mutates the store; workers hand results back
/// by message.
pub struct RecordStore {
    key: SnapshotKey,
    backend: Box<dyn SnapshotBackend>,
    records: BTreeMap<String, EnrichmentRecord>,
    order: Vec<String>,
}

impl RecordStore {
    /// Reads the snapshot for `key`, or starts empty when none exists.
    pub fn load(key: SnapshotKey, backend: Box<dyn SnapshotBackend>) -> EnrichmentResult<Self> {
        let records: BTreeMap<String, EnrichmentRecord> = match backend.read(&key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| EnrichmentError::snapshot(key.file_name(), err))?,
            None => BTreeMap::new(),
        };
        debug!(run = %key, records = records.len(), "Loaded record store");
        Ok(Self {
            key,
            backend,
            records,
            order: Vec::new(),
        })
    }

    /// Inserts an unresolved record for every listed title the store lacks and
    /// fixes the dispatch order to the list order.
    pub fn seed(&mut self, papers: &PaperList) {
        let mut seen: HashSet<&str> = self.order.iter().map(String::as_str).collect();
        let mut appended = Vec::new();
        for (title, authors, link) in papers.iter() {
            if !seen.insert(title) {
                continue;
            }
            self.records
                .entry(title.to_string())
                .or_insert_with(|| EnrichmentRecord::unresolved(authors, link));
            appended.push(title.to_string());
        }
        self.order.extend(appended);
    }

    /// Every record still awaiting a lookup: seeded titles in seed order, then
    /// unseeded snapshot records in key order.
    pub fn pending(&self) -> Vec<String> {
        let mut pending: Vec<String> = self
            .order
            .iter()
            .filter(|title| {
                self.records
                    .get(title.as_str())
                    .is_some_and(EnrichmentRecord::is_pending)
            })
            .cloned()
            .collect();
        pending.extend(self.unseeded_pending().map(str::to_string));
        pending
    }

    fn unseeded_pending(&self) -> impl Iterator<Item = &str> {
        let seeded: HashSet<&str> = self.order.iter().map(String::as_str).collect();
        self.records
            .iter()
            .filter(move |(title, record)| record.is_pending() && !seeded.contains(title.as_str()))
            .map(|(title, _)| title.as_str())
    }

    pub fn apply(&mut self, title: &str, citations: i64) -> EnrichmentResult<()> {
        let record = self
            .records
            .get_mut(title)
            .ok_or_else(|| EnrichmentError::UnknownTitle(title.to_string()))?;
        record.resolve(citations);
        Ok(())
    }

    /// Replaces the durable snapshot with the current in-memory state.
    pub fn flush(&self) -> EnrichmentResult<()> {
        let payload = serde_json::to_vec(&self.records)
            .map_err(|err| EnrichmentError::snapshot(self.key.file_name(), err))?;
        self.backend.write(&self.key, &payload)?;
        debug!(run = %self.key, records = self.records.len(), "Flushed record store");
        Ok(())
    }

    /// Projects the store back onto `titles`, in that order.
    ///
    /// Records never looked up project as `NOT_FOUND`; titles absent from the
    /// store fail the whole projection.
    pub fn to_rows(&self, titles: &[String]) -> EnrichmentResult<Vec<PaperRow>> {
        let mut rows = Vec::with_capacity(titles.len());
        let mut missing = Vec::new();
        for title in titles {
            match self.records.get(title) {
                Some(record) => rows.push(PaperRow {
                    authors: record.authors.clone(),
                    title: title.clone(),
                    link: record.link.clone(),
                    citations: record.citations.unwrap_or(NOT_FOUND),
                    etc: record.etc.clone(),
                }),
                None => missing.push(title.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(EnrichmentError::IncompleteResult { missing });
        }
        Ok(rows)
    }

    pub fn get(&self, title: &str) -> Option<&EnrichmentRecord> {
        self.records.get(title)
    }

    pub fn key(&self) -> &SnapshotKey {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of distinct titles seeded for this run.
    pub fn seeded_len(&self) -> usize {
        self.order.len()
    }

    /// Titles a run over this store accounts for: the seeded ones plus any
    /// unseeded record still pending.
    pub fn tracked_len(&self) -> usize {
        self.order.len() + self.unseeded_pending().count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
