use super::error::EnrichmentResult;
use super::record::PaperRow;
use super::store::RecordStore;

/// Rebuilds the paper rows in listing order.
///
/// Completion order never leaks through: rows follow `titles`, one per entry,
/// duplicates included.
pub fn assemble(titles: &[String], store: &RecordStore) -> EnrichmentResult<Vec<PaperRow>> {
    store.to_rows(titles)
}
