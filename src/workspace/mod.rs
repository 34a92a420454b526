mod config;

pub use config::{
    config_file_path, ensure_workspace_structure, load_or_default, save, workspace_root,
    AppConfig, CitationSource, EnrichmentSettings, OutputSettings, ResolverSettings,
    WorkspacePaths, CONFIG_FILE_NAME, HOME_ENV_VAR,
};
