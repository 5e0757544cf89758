//! Reading scheduler configuration from disk

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ConfigError, DistbuildError, Result};

use super::defaults::config_file_names;
use super::types::SchedulerConfig;
use super::validation::validate_config;

/// On-disk configuration syntax, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// `.toml` files are TOML, everything else is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }

    fn parse(self, content: &str) -> Result<SchedulerConfig> {
        let config = match self {
            Self::Toml => toml::from_str(content).map_err(ConfigError::TomlError)?,
            Self::Yaml => serde_yaml::from_str(content).map_err(ConfigError::YamlError)?,
        };
        Ok(config)
    }
}

impl SchedulerConfig {
    /// Parse and validate the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path);
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config = format.parse(&content)?;
        validate_config(&config)?;
        debug!(path = %path.display(), ?format, "scheduler config loaded");
        Ok(config)
    }

    /// Nearest configuration file in `start_dir` or one of its ancestors.
    ///
    /// Within a directory, earlier names in [`config_file_names`] win.
    pub fn discover(start_dir: &Path) -> Option<PathBuf> {
        start_dir.ancestors().find_map(|dir| {
            config_file_names()
                .into_iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Discover and load the configuration that applies to `dir`
    pub fn load_from_dir(dir: &Path) -> Result<(Self, PathBuf)> {
        let path = Self::discover(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;
        let config = Self::load(&path)?;
        Ok((config, path))
    }

    /// Like [`SchedulerConfig::load_from_dir`], falling back to defaults
    pub fn load_or_default(dir: &Path) -> (Self, Option<PathBuf>) {
        match Self::load_from_dir(dir) {
            Ok((config, path)) => (config, Some(path)),
            Err(DistbuildError::Config(ConfigError::NotFound(_))) => (Self::default(), None),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "ignoring invalid scheduler config");
                (Self::default(), None)
            }
        }
    }
}
