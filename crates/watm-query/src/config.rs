//! Engine configuration.
//!
//! Stored in `~/.watm/config.toml`; every section is optional and missing
//! values take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use watm_core::{WatmError, WatmResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatmConfig {
    pub dataset: DatasetConfig,
    pub cache: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory holding `scenarios`, `time` and the variable tables.
    pub dir: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data_parquet"),
        }
    }
}

/// Cache sizing and pre-warm behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// General tier bound; 0 disables the general tier.
    pub max_size: usize,

    /// Number of variables (in catalog order) kept in the default tier.
    pub prewarm_limit: usize,

    /// Fill the default tier while the engine is constructed.
    pub prewarm_on_startup: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_size: 128,
            prewarm_limit: 5,
            prewarm_on_startup: true,
        }
    }
}

impl WatmConfig {
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".watm"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Loads `~/.watm/config.toml`, or defaults when it does not exist.
    pub fn load() -> WatmResult<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> WatmResult<Self> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| WatmError::Parse(format!("{}: {e}", path.display())))
    }

    pub fn save_to(&self, path: &Path) -> WatmResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| WatmError::Parse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_documented_values() {
        let config = WatmConfig::default();
        assert_eq!(config.cache.max_size, 128);
        assert_eq!(config.cache.prewarm_limit, 5);
        assert!(config.cache.prewarm_on_startup);
        assert_eq!(config.dataset.dir, PathBuf::from("data_parquet"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: WatmConfig = toml::from_str(
            r#"
            [cache]
            max_size = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.max_size, 8);
        assert_eq!(config.cache.prewarm_limit, 5);
        assert_eq!(config.dataset, DatasetConfig::default());
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = WatmConfig::default();
        config.dataset.dir = PathBuf::from("/data/watm");
        config.cache.prewarm_on_startup = false;
        config.save_to(&path).unwrap();
        assert_eq!(WatmConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nmax_size = \"lots\"\n").unwrap();
        assert!(matches!(
            WatmConfig::load_from(&path),
            Err(WatmError::Parse(_))
        ));
    }
}
