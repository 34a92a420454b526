//! Paper lists for a venue/year, as handed over by the listing source.
//!
//! The enrichment core only needs three parallel sequences (authors, titles,
//! links). Scraping them is somebody else's job; this module validates what
//! comes back and offers a JSON-file source for lists prepared ahead of time.

mod venue;

pub use venue::Venue;

use crate::enrichment::{EnrichmentError, EnrichmentResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Authors, titles and links of one venue/year, index-aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperList {
    authors: Vec<String>,
    titles: Vec<String>,
    links: Vec<String>,
}

impl PaperList {
    /// Fails fast unless the three sequences are non-empty and equally long.
    pub fn from_parallel(
        authors: Vec<String>,
        titles: Vec<String>,
        links: Vec<String>,
    ) -> EnrichmentResult<Self> {
        if titles.is_empty() {
            return Err(EnrichmentError::MalformedInput(
                "paper list is empty".into(),
            ));
        }
        if authors.len() != titles.len() || links.len() != titles.len() {
            return Err(EnrichmentError::MalformedInput(format!(
                "paper list sequences differ in length (authors {}, titles {}, links {})",
                authors.len(),
                titles.len(),
                links.len()
            )));
        }
        Ok(Self {
            authors,
            titles,
            links,
        })
    }

    pub fn from_entries(entries: Vec<PaperEntry>) -> EnrichmentResult<Self> {
        let mut authors = Vec::with_capacity(entries.len());
        let mut titles = Vec::with_capacity(entries.len());
        let mut links = Vec::with_capacity(entries.len());
        for entry in entries {
            authors.push(entry.authors);
            titles.push(entry.title);
            links.push(entry.link);
        }
        Self::from_parallel(authors, titles, links)
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Yields `(title, authors, link)` in list order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.titles
            .iter()
            .zip(&self.authors)
            .zip(&self.links)
            .map(|((title, authors), link)| (title.as_str(), authors.as_str(), link.as_str()))
    }
}

/// One paper as stored in a JSON paper-list file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperEntry {
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub link: String,
}

/// Supplies the paper list for a venue and year.
pub trait PaperListSource {
    fn fetch(&self, venue: Venue, year: i32) -> Result<PaperList>;
}

/// Reads `<Venue>_<year>.json` files (arrays of [`PaperEntry`]) from a directory,
/// or one explicit file regardless of venue/year.
#[derive(Debug, Clone)]
pub enum JsonPaperListSource {
    Directory(PathBuf),
    File(PathBuf),
}

impl JsonPaperListSource {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::Directory(dir.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn path_for(&self, venue: Venue, year: i32) -> PathBuf {
        match self {
            Self::Directory(dir) => dir.join(format!("{}_{year}.json", venue.name())),
            Self::File(path) => path.clone(),
        }
    }
}

impl PaperListSource for JsonPaperListSource {
    fn fetch(&self, venue: Venue, year: i32) -> Result<PaperList> {
        let path = self.path_for(venue, year);
        let entries = read_entries(&path)
            .with_context(|| format!("No {} papers available for {year}", venue.name()))?;
        let list = PaperList::from_entries(entries)
            .with_context(|| format!("Paper list {} is unusable", path.display()))?;
        Ok(list)
    }
}

fn read_entries(path: &Path) -> Result<Vec<PaperEntry>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Unable to read paper list {}", path.display()))?;
    let entries = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse paper list {}", path.display()))?;
    Ok(entries)
}
