use super::{paper_list, today, IntegrationHarness, StubResolver};
use anyhow::Result;
use citerank::enrichment::{
    CitationResolver, EnrichmentError, FileSnapshotBackend, RecordStore, Resolution,
    SilentProgress, SnapshotKey,
};
use citerank::papers::Venue;
use citerank::pipeline::RankingRequest;
use std::fs;
use std::sync::Arc;

fn request() -> RankingRequest {
    RankingRequest {
        venue: Venue::Icml,
        year: 2021,
        month: None,
    }
}

/// Panics on one title, standing in for a worker process that dies.
struct CrashingResolver {
    poison: &'static str,
}

impl CitationResolver for CrashingResolver {
    fn resolve(&self, title: &str) -> Resolution {
        if title == self.poison {
            panic!("lookup worker died");
        }
        Resolution::new(title, title.len() as i64)
    }
}

#[test]
fn interrupted_run_resumes_from_last_flush() -> Result<()> {
    let harness = IntegrationHarness::new();
    let titles: Vec<String> = (0..7).map(|i| format!("paper-{i}")).collect();
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let papers = paper_list(&refs);

    let crashing = Arc::new(CrashingResolver { poison: "paper-4" });
    let err = harness
        .pipeline(crashing, 2)
        .run(&request(), &papers, harness.backend(), &mut SilentProgress, today())
        .err()
        .expect("crashed worker must fail the run");
    assert!(matches!(
        err.downcast_ref::<EnrichmentError>(),
        Some(EnrichmentError::Scheduler(_))
    ));

    let snapshot = RecordStore::load(
        SnapshotKey::new("ICML", 2021),
        Box::new(FileSnapshotBackend::new(&harness.paths().snapshots_dir)),
    )?;
    assert_eq!(snapshot.get("paper-0").and_then(|r| r.citations), Some(7));
    assert!(snapshot.get("paper-4").is_some_and(|r| r.is_pending()));

    let answers: Vec<(&str, i64)> = refs.iter().map(|t| (*t, 1)).collect();
    let healthy = StubResolver::new(&answers);
    let outcome = harness
        .pipeline(healthy.clone(), 2)
        .run(&request(), &papers, harness.backend(), &mut SilentProgress, today())?;
    assert_eq!(healthy.calls(), 1);
    assert_eq!(outcome.summary.skipped, 6);
    let resumed = outcome.rows.iter().find(|r| r.title == "paper-4").expect("row for paper-4");
    assert_eq!(resumed.citations, 1);
    Ok(())
}

#[test]
fn snapshots_in_the_legacy_layout_are_resumed() -> Result<()> {
    let harness = IntegrationHarness::new();
    let key = request().snapshot_key();
    fs::write(
        harness.paths().snapshots_dir.join(key.file_name()),
        r#"{"Old": {"authors": "X", "link": "l1", "citations": 12, "etc": ""},
            "New": {"authors": "Y", "link": "l2"}}"#,
    )?;
    let stub = StubResolver::new(&[("New", 3), ("Newest", 20)]);
    let outcome = harness.pipeline(stub.clone(), 100).run(
        &request(),
        &paper_list(&["Old", "New", "Newest"]),
        harness.backend(),
        &mut SilentProgress,
        today(),
    )?;
    assert_eq!(stub.calls(), 2);
    let titles: Vec<&str> = outcome.rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Newest", "Old", "New"]);
    // The record kept from the snapshot keeps its stored authors.
    assert_eq!(outcome.rows[1].authors, "X");
    Ok(())
}
