//! Ranking of enriched papers and the derived citation rates.

mod export;

pub use export::{csv_file_name, format_table, write_csv};

use crate::enrichment::PaperRow;
use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};

/// Denominators for the per-year and per-month citation rates.
///
/// Both count the publication period itself, so a paper published this year
/// divides by 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationWindow {
    year_span: i64,
    month_span: Option<i64>,
}

impl CitationWindow {
    pub fn new(year: i32, month: Option<u32>, today: NaiveDate) -> Result<Self> {
        if year > today.year() {
            bail!("Year must be <= {}.", today.year());
        }
        let year_diff = i64::from(today.year() - year);
        let month_span = match month {
            None => None,
            Some(month) => {
                if !(1..=12).contains(&month) {
                    bail!("Month must be in range [1, ..., 12].");
                }
                if year == today.year() && month > today.month() {
                    bail!("Month must be <= {}.", today.month());
                }
                let month_diff = i64::from(today.month()) - i64::from(month) + 12 * year_diff;
                Some(month_diff + 1)
            }
        };
        Ok(Self {
            year_span: year_diff + 1,
            month_span,
        })
    }

    pub fn has_month(&self) -> bool {
        self.month_span.is_some()
    }

    pub fn per_year(&self, citations: i64) -> i64 {
        rate(citations, self.year_span)
    }

    pub fn per_month(&self, citations: i64) -> Option<i64> {
        self.month_span.map(|span| rate(citations, span))
    }
}

// Half-to-even, so 7.5 -> 8 and 2.5 -> 2.
fn rate(citations: i64, span: i64) -> i64 {
    (citations as f64 / span as f64).round_ties_even() as i64
}

/// One line of the ranked table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    /// 1-based position in the paper list.
    pub id: usize,
    pub authors: String,
    pub title: String,
    pub citations: i64,
    pub link: String,
    pub etc: String,
    pub citations_per_year: i64,
    pub citations_per_month: Option<i64>,
}

/// Sorts rows by citations, highest first; ties keep listing order.
pub fn rank(rows: Vec<PaperRow>, window: &CitationWindow) -> Vec<RankedRow> {
    let mut ranked: Vec<RankedRow> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| RankedRow {
            id: idx + 1,
            citations_per_year: window.per_year(row.citations),
            citations_per_month: window.per_month(row.citations),
            authors: row.authors,
            title: row.title,
            citations: row.citations,
            link: row.link,
            etc: row.etc,
        })
        .collect();
    ranked.sort_by(|a, b| b.citations.cmp(&a.citations));
    ranked
}
