use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use citerank::enrichment::{
    format_run_status, format_skip_notice, resolver_from_settings, EnrichmentScheduler,
    EnrichmentSummary, FileSnapshotBackend, ProgressObserver, Resolution,
};
use citerank::orchestration::RunLog;
use citerank::papers::{JsonPaperListSource, PaperListSource, Venue};
use citerank::pipeline::{RankingPipeline, RankingRequest};
use citerank::ranking::{csv_file_name, format_table, write_csv};
use citerank::workspace::{ensure_workspace_structure, load_or_default};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TABLE_ROWS: usize = 30;

#[derive(Parser)]
#[command(name = "citerank")]
#[command(about = "Ranks the papers of a conference year by citation count")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Conference name (cvpr, iccv, iclr, icml, eccv, icra, nips/neurips)")]
    conference: String,

    #[arg(long, help = "Conference year")]
    year: i32,

    #[arg(long, help = "Conference month, enables the cit/month column")]
    month: Option<u32>,

    #[arg(long, help = "Directory for the exported CSV (default from config, else current folder)")]
    csvpath: Option<PathBuf>,

    #[arg(long, help = "JSON paper list to use instead of <workspace>/papers/<Venue>_<year>.json")]
    papers: Option<PathBuf>,

    #[arg(long, help = "Number of concurrent citation lookups")]
    concurrency: Option<usize>,

    #[arg(long, help = "Completed lookups between snapshot flushes")]
    flush_every: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let venue: Venue = cli.conference.parse()?;
    let paths = ensure_workspace_structure()?;
    let config = load_or_default()?;

    if cli.month.is_none() {
        println!("Please provide month for \"cit/month\" information.");
    }

    let request = RankingRequest {
        venue,
        year: cli.year,
        month: cli.month,
    };

    println!("Loading {} {} results", venue, cli.year);
    let source = match &cli.papers {
        Some(path) => JsonPaperListSource::file(path),
        None => JsonPaperListSource::in_dir(&paths.papers_dir),
    };
    let papers = source.fetch(venue, cli.year)?;
    println!("Found {} papers.", papers.len());

    let resolver = resolver_from_settings(&config.resolver)?;
    let mut scheduler = EnrichmentScheduler::new(resolver, &config.enrichment);
    if let Some(concurrency) = cli.concurrency {
        scheduler = scheduler.with_concurrency(concurrency);
    }
    if let Some(flush_every) = cli.flush_every {
        scheduler = scheduler.with_flush_every(flush_every);
    }
    let pipeline = RankingPipeline::new(scheduler).with_log(RunLog::at(paths.events_log()));

    let backend = FileSnapshotBackend::new(&paths.snapshots_dir);
    info!(snapshot = %backend.path_for(&request.snapshot_key()).display(), "Using snapshot");
    let mut progress = ConsoleProgress::default();
    let outcome = pipeline.run(
        &request,
        &papers,
        Box::new(backend),
        &mut progress,
        Local::now().date_naive(),
    )?;
    println!("{}", format_run_status(&outcome.key, &outcome.summary));

    print!("{}", format_table(&outcome.rows, TABLE_ROWS));

    let csv_dir = cli.csvpath.unwrap_or(config.output.csv_dir);
    let csv_path = csv_dir.join(csv_file_name(venue.name(), cli.year));
    write_csv(&csv_path, &outcome.rows, outcome.window.has_month())
        .with_context(|| format!("Failed to export ranking to {}", csv_path.display()))?;
    pipeline.record_export(&outcome, &csv_path)?;
    println!("Saved {}", csv_path.display());
    Ok(())
}

#[derive(Default)]
struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ProgressObserver for ConsoleProgress {
    fn started(&mut self, pending: usize, total: usize) {
        println!(
            "{}",
            format_skip_notice(&EnrichmentSummary {
                total,
                skipped: total.saturating_sub(pending),
                ..EnrichmentSummary::default()
            })
        );
        if pending == 0 {
            return;
        }
        let bar = ProgressBar::new(pending as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}<{eta}] {wide_msg}")
        {
            bar.set_style(style);
        }
        self.bar = Some(bar);
    }

    fn completed(&mut self, _done: usize, _pending: usize, resolution: &Resolution) {
        if let Some(bar) = &self.bar {
            bar.set_message(resolution.title.clone());
            bar.inc(1);
        }
    }

    fn finished(&mut self, _summary: &EnrichmentSummary) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
