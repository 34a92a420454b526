use super::record::SnapshotKey;
use super::scheduler::EnrichmentSummary;

/// Line shown before dispatch, mirroring what a resumed run will skip.
pub fn format_skip_notice(summary: &EnrichmentSummary) -> String {
    format!(
        "Skipping already done {} papers of total {} papers.",
        summary.skipped, summary.total
    )
}

pub fn format_run_status(key: &SnapshotKey, summary: &EnrichmentSummary) -> String {
    let percent = if summary.total == 0 {
        0.0
    } else {
        ((summary.skipped + summary.resolved) as f64 / summary.total as f64) * 100.0
    };
    let flushes = match summary.flushes {
        0 => "no snapshot written".to_string(),
        1 => "1 snapshot flush".to_string(),
        n => format!("{n} snapshot flushes"),
    };
    format!(
        "{key}: {percent:.1}% resolved (looked up {}, not found {}, skipped {}), {flushes}, {:.1}s.",
        summary.resolved,
        summary.not_found,
        summary.skipped,
        summary.duration_ms as f64 / 1000.0
    )
}
