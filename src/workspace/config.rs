//! Configuration primitives for citerank runs.
//!
//! Stored in a machine-readable TOML file located at:
//!   $CITERANK_HOME/config/config.toml when the variable is set
//!   <OS data dir>/citerank/config/config.toml otherwise
//!
//! The config carries the enrichment pool knobs, the citation lookup service
//! settings and the default CSV destination. Command-line flags override these
//! values for a single run without touching the file.

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Worker pool and checkpoint cadence.
    #[serde(default)]
    pub enrichment: EnrichmentSettings,
    /// Citation lookup service selection, deadlines and retry policy.
    #[serde(default)]
    pub resolver: ResolverSettings,
    /// Where ranked tables are written.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Enrichment scheduler defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSettings {
    /// Number of lookups in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Completed lookups between snapshot flushes.
    #[serde(default = "default_flush_every")]
    pub flush_every: u32,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            flush_every: default_flush_every(),
        }
    }
}

impl EnrichmentSettings {
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1) as usize
    }

    pub fn flush_every(&self) -> usize {
        self.flush_every.max(1) as usize
    }
}

const fn default_concurrency() -> u32 {
    5
}

const fn default_flush_every() -> u32 {
    100
}

/// Which bibliographic service answers citation lookups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CitationSource {
    #[default]
    Crossref,
    Opencitations,
}

/// Citation lookup service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    #[serde(default)]
    pub source: CitationSource,
    #[serde(default = "default_crossref_endpoint")]
    pub crossref_endpoint: String,
    #[serde(default = "default_opencitations_endpoint")]
    pub opencitations_endpoint: String,
    /// Sent as the `authorization` header to OpenCitations.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Contact address for the Crossref polite pool.
    #[serde(default)]
    pub mailto: Option<String>,
    /// Per-request deadline (ms).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Attempts per title before settling on the not-found sentinel.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            source: CitationSource::default(),
            crossref_endpoint: default_crossref_endpoint(),
            opencitations_endpoint: default_opencitations_endpoint(),
            access_token: None,
            mailto: None,
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl ResolverSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_crossref_endpoint() -> String {
    "https://api.crossref.org/works".into()
}

fn default_opencitations_endpoint() -> String {
    "https://opencitations.net/index/api/v2/citation-count".into()
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    16_000
}

/// Output destination defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_csv_dir")]
    pub csv_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            csv_dir: default_csv_dir(),
        }
    }
}

fn default_csv_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Standard relative path to the config file (resolved per OS at runtime).
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable that relocates the whole workspace.
pub const HOME_ENV_VAR: &str = "CITERANK_HOME";

/// Returns the root directory where citerank keeps snapshots, paper lists and logs.
///
/// Order of precedence:
/// 1. `CITERANK_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var(HOME_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("citerank"))
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join("config"))
}

/// Path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default() -> Result<AppConfig> {
    let path = config_file_path()?;
    if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

/// Persists the configuration to disk.
pub fn save(config: &AppConfig) -> Result<()> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    let path = config_file_path()?;
    let data = toml::to_string_pretty(config)?;
    fs::write(&path, data).with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}

/// Ensures the workspace structure exists and returns its paths.
pub fn ensure_workspace_structure() -> Result<WorkspacePaths> {
    let paths = WorkspacePaths::new(workspace_root()?);
    for dir in [&paths.snapshots_dir, &paths.papers_dir, &paths.logs_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create workspace directory {:?}", dir))?;
    }
    Ok(paths)
}

/// Convenience struct exposing important workspace paths.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub snapshots_dir: PathBuf,
    pub papers_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: PathBuf) -> Self {
        Self {
            snapshots_dir: root.join("snapshots"),
            papers_dir: root.join("papers"),
            logs_dir: root.join("logs"),
            root,
        }
    }

    pub fn events_log(&self) -> PathBuf {
        self.logs_dir.join("events.jsonl")
    }
}
