use citerank::enrichment::{CitationResolver, EnrichmentScheduler, FileSnapshotBackend};
use citerank::orchestration::RunLog;
use citerank::papers::PaperList;
use citerank::pipeline::RankingPipeline;
use citerank::workspace::{EnrichmentSettings, WorkspacePaths};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

mod end_to_end;
mod resume;
mod workspace_config;

pub struct IntegrationHarness {
    workspace: TempDir,
    paths: WorkspacePaths,
}

impl IntegrationHarness {
    pub fn new() -> Self {
        let workspace = TempDir::new().expect("failed to create temp workspace");
        let paths = WorkspacePaths::new(workspace.path().to_path_buf());
        for dir in [&paths.snapshots_dir, &paths.papers_dir, &paths.logs_dir] {
            fs::create_dir_all(dir).expect("failed to create workspace layout");
        }
        Self { workspace, paths }
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    pub fn output_dir(&self) -> std::path::PathBuf {
        self.workspace.path().join("out")
    }

    pub fn backend(&self) -> Box<FileSnapshotBackend> {
        Box::new(FileSnapshotBackend::new(&self.paths.snapshots_dir))
    }

    pub fn log(&self) -> RunLog {
        RunLog::at(self.paths.events_log())
    }

    pub fn pipeline(&self, resolver: Arc<dyn CitationResolver>, flush_every: usize) -> RankingPipeline {
        let scheduler = EnrichmentScheduler::new(resolver, &EnrichmentSettings::default())
            .with_concurrency(3)
            .with_flush_every(flush_every);
        RankingPipeline::new(scheduler).with_log(self.log())
    }
}

/// Resolver answering from a fixed table and counting its calls.
pub struct StubResolver {
    answers: HashMap<String, i64>,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn new(answers: &[(&str, i64)]) -> Arc<Self> {
        Arc::new(Self {
            answers: answers
                .iter()
                .map(|(title, count)| (title.to_string(), *count))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CitationResolver for StubResolver {
    fn resolve(&self, title: &str) -> citerank::enrichment::Resolution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let citations = self.answers.get(title).copied().unwrap_or(-1);
        citerank::enrichment::Resolution::new(title, citations)
    }
}

pub fn paper_list(titles: &[&str]) -> PaperList {
    PaperList::from_parallel(
        titles.iter().map(|t| format!("Author of {t}")).collect(),
        titles.iter().map(|t| t.to_string()).collect(),
        titles.iter().map(|t| format!("https://openaccess/{t}")).collect(),
    )
    .expect("valid paper list")
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 9, 1).expect("valid date")
}
