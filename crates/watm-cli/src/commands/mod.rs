pub mod catalog;
pub mod sensitivity;
pub mod series;
pub mod warmup;

use anyhow::{Context, Result};
use tracing::info;
use watm_query::{ScenarioQueryEngine, WatmConfig};

use crate::cli::Cli;

/// Config file, then flag overrides.
pub fn load_config(cli: &Cli) -> Result<WatmConfig> {
    let mut config = match &cli.config {
        Some(path) => WatmConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => WatmConfig::load().context("loading ~/.watm/config.toml")?,
    };
    if let Some(dir) = &cli.data_dir {
        config.dataset.dir = dir.clone();
    }
    if let Some(size) = cli.cache_size {
        config.cache.max_size = size;
    }
    if cli.no_prewarm {
        config.cache.prewarm_on_startup = false;
    }
    Ok(config)
}

pub fn open_engine(config: &WatmConfig) -> Result<ScenarioQueryEngine> {
    info!(dir = %config.dataset.dir.display(), "opening dataset");
    ScenarioQueryEngine::open(&config.dataset.dir, config.cache.clone())
        .with_context(|| format!("opening dataset {}", config.dataset.dir.display()))
}
