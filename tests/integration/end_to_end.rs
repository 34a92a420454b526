use super::{paper_list, today, IntegrationHarness, StubResolver};
use anyhow::Result;
use citerank::enrichment::SilentProgress;
use citerank::orchestration::EventType;
use citerank::papers::Venue;
use citerank::pipeline::RankingRequest;
use citerank::ranking::{csv_file_name, write_csv};
use std::fs;

fn request() -> RankingRequest {
    RankingRequest {
        venue: Venue::Cvpr,
        year: 2020,
        month: None,
    }
}

#[test]
fn ranks_by_citations_and_reruns_without_lookups() -> Result<()> {
    let harness = IntegrationHarness::new();
    let papers = paper_list(&["A", "B", "C"]);
    let stub = StubResolver::new(&[("A", 5), ("B", -1), ("C", 10)]);

    let first = harness
        .pipeline(stub.clone(), 100)
        .run(&request(), &papers, harness.backend(), &mut SilentProgress, today())?;
    let order: Vec<&str> = first.rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(order, vec!["C", "A", "B"]);
    assert_eq!(
        first.rows.iter().map(|r| r.citations).collect::<Vec<_>>(),
        vec![10, 5, -1]
    );
    assert_eq!(first.rows[0].id, 3);
    assert_eq!(stub.calls(), 3);
    assert_eq!(first.summary.flushes, 1);

    let rerun_stub = StubResolver::new(&[("A", 5), ("B", -1), ("C", 10)]);
    let second = harness
        .pipeline(rerun_stub.clone(), 100)
        .run(&request(), &papers, harness.backend(), &mut SilentProgress, today())?;
    assert_eq!(rerun_stub.calls(), 0);
    assert_eq!(second.rows, first.rows);
    assert_eq!(second.summary.skipped, 3);
    assert_eq!(second.summary.flushes, 0);

    let kinds: Vec<EventType> = harness
        .log()
        .events_for(&request().snapshot_key())?
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventType::EnrichmentStarted,
            EventType::EnrichmentCompleted,
            EventType::EnrichmentSkipped
        ]
    );
    Ok(())
}

#[test]
fn exported_csv_carries_rates() -> Result<()> {
    let harness = IntegrationHarness::new();
    let papers = paper_list(&["Slow burner", "Hit"]);
    let stub = StubResolver::new(&[("Slow burner", 30), ("Hit", 400)]);
    let request = RankingRequest {
        venue: Venue::NeurIPS,
        year: 2020,
        month: Some(12),
    };
    let pipeline = harness.pipeline(stub, 100);
    let outcome = pipeline.run(&request, &papers, harness.backend(), &mut SilentProgress, today())?;

    let path = harness
        .output_dir()
        .join(csv_file_name(request.venue.name(), request.year));
    write_csv(&path, &outcome.rows, outcome.window.has_month())?;
    pipeline.record_export(&outcome, &path)?;

    assert!(path.ends_with("NeurIPS2020.csv"));
    let text = fs::read_to_string(&path)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "ID,Author,Title,Citations,Source,cit/year,cit/month,Etc");
    // 400 / 4 years = 100; months: (9 - 12 + 36) + 1 = 34 -> 400 / 34 = 11.76
    assert_eq!(lines[1], "2,Author of Hit,Hit,400,https://openaccess/Hit,100,12,");
    // 30 / 4 = 7.5 -> 8
    assert!(lines[2].starts_with("1,Author of Slow burner,Slow burner,30,https://openaccess/Slow burner,8,"));
    Ok(())
}

#[test]
fn invalid_month_fails_before_any_lookup() {
    let harness = IntegrationHarness::new();
    let stub = StubResolver::new(&[]);
    let request = RankingRequest {
        venue: Venue::Iclr,
        year: 2023,
        month: Some(11),
    };
    let result = harness.pipeline(stub.clone(), 100).run(
        &request,
        &paper_list(&["X"]),
        harness.backend(),
        &mut SilentProgress,
        today(),
    );
    assert!(result.is_err());
    assert_eq!(stub.calls(), 0);
    assert!(!harness
        .paths()
        .snapshots_dir
        .join(request.snapshot_key().file_name())
        .exists());
}

#[test]
fn duplicate_titles_are_counted_once_in_run_events() -> Result<()> {
    let harness = IntegrationHarness::new();
    let papers = paper_list(&["A", "A", "B"]);
    let stub = StubResolver::new(&[("A", 2), ("B", 1)]);

    let first = harness
        .pipeline(stub.clone(), 100)
        .run(&request(), &papers, harness.backend(), &mut SilentProgress, today())?;
    assert_eq!(stub.calls(), 2);
    assert_eq!(first.rows.len(), 3);

    harness
        .pipeline(stub.clone(), 100)
        .run(&request(), &papers, harness.backend(), &mut SilentProgress, today())?;
    assert_eq!(stub.calls(), 2);

    let totals: Vec<(EventType, u64)> = harness
        .log()
        .events_for(&request().snapshot_key())?
        .into_iter()
        .filter_map(|e| e.details["total"].as_u64().map(|total| (e.event_type, total)))
        .collect();
    assert_eq!(
        totals,
        vec![
            (EventType::EnrichmentStarted, 2),
            (EventType::EnrichmentSkipped, 2)
        ]
    );
    Ok(())
}
