//! Configuration paths for Tabula
//!
//! All paths are under ~/.tabula/ (or `TABULA_HOME`).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tabula_logging::tabula_home;
use tabula_schema::defaults::CONFIG_FILE_NAME;
use tabula_schema::DetailsConfig;

/// Get the config file path: ~/.tabula/config.toml
pub fn config_path() -> PathBuf {
    tabula_home().join(CONFIG_FILE_NAME)
}

/// Load the config file, or the defaults when there is none.
pub fn load_details_config() -> Result<DetailsConfig> {
    load_details_config_from(&config_path())
}

pub fn load_details_config_from(path: &Path) -> Result<DetailsConfig> {
    DetailsConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))
}
