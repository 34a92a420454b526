use serde::{Deserialize, Serialize};
use std::fmt;

/// Citation count recorded when a lookup was attempted but produced nothing.
pub const NOT_FOUND: i64 = -1;

/// Enrichment state for one paper, keyed by title in the record store.
///
/// `citations` stays `None` until a lookup has been attempted; `Some(-1)` is a
/// resolved record with no data, not a pending one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EnrichmentRecord {
    pub authors: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<i64>,
    #[serde(default)]
    pub etc: String,
}

impl EnrichmentRecord {
    pub fn unresolved(authors: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            authors: authors.into(),
            link: link.into(),
            citations: None,
            etc: String::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.citations.is_none()
    }

    pub fn resolve(&mut self, citations: i64) {
        self.citations = Some(citations.max(NOT_FOUND));
        self.etc.clear();
    }
}

/// Identifies one enrichment run and its durable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub venue: String,
    pub year: i32,
}

impl SnapshotKey {
    pub fn new(venue: impl Into<String>, year: i32) -> Self {
        Self {
            venue: venue.into(),
            year,
        }
    }

    /// File name the snapshot is stored under.
    pub fn file_name(&self) -> String {
        format!("{}_{}_completed.json", self.venue, self.year)
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.venue, self.year)
    }
}

/// One paper projected out of the store, ready for ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRow {
    pub authors: String,
    pub title: String,
    pub link: String,
    pub citations: i64,
    pub etc: String,
}
