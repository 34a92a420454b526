use anyhow::Result;
use citerank::workspace::{
    config_file_path, ensure_workspace_structure, load_or_default, save, CitationSource,
    HOME_ENV_VAR,
};
use std::env;
use tempfile::TempDir;

// The only test that touches the process environment.
#[test]
fn workspace_layout_and_config_live_under_home() -> Result<()> {
    let home = TempDir::new()?;
    env::set_var(HOME_ENV_VAR, home.path());

    let paths = ensure_workspace_structure()?;
    assert_eq!(paths.root, home.path());
    assert!(paths.snapshots_dir.is_dir());
    assert!(paths.papers_dir.is_dir());
    assert!(paths.logs_dir.is_dir());

    let defaults = load_or_default()?;
    assert_eq!(defaults.enrichment.concurrency(), 5);
    assert_eq!(defaults.enrichment.flush_every(), 100);

    let mut config = defaults.clone();
    config.resolver.source = CitationSource::Opencitations;
    config.enrichment.flush_every = 25;
    save(&config)?;
    assert!(config_file_path()?.starts_with(home.path()));

    let reloaded = load_or_default()?;
    assert_eq!(reloaded.resolver.source, CitationSource::Opencitations);
    assert_eq!(reloaded.enrichment.flush_every(), 25);

    env::remove_var(HOME_ENV_VAR);
    Ok(())
}
