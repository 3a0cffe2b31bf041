//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::config::{EnvOverrides, SmarterConfig};

/// Prefix of every environment override (`SMARTER_DATABASE_PATH`, ...).
pub const ENV_PREFIX: &str = "SMARTER_";

/// Production `ConfigStore`: a YAML file overlaid with `SMARTER_*` variables.
#[derive(Debug, Default, Clone)]
pub struct YamlConfigStore {
    path: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Store at `SMARTER_CONFIG`, or `~/.smarter/config.yaml`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store at an explicit path (used in tests).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn read_file(&self) -> Result<SmarterConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(SmarterConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(SmarterConfig::default());
        }
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }
}

impl ConfigStore for YamlConfigStore {
    /// Defaults, then the file, then `SMARTER_*` variables. Flags are applied
    /// by the command layer, which validates again afterwards.
    fn load(&self) -> Result<SmarterConfig> {
        let mut config = self.read_file()?;
        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX)
            .from_env()
            .context("invalid SMARTER_* environment variable")?;
        config.apply_env(overrides)?;
        config.validate()?;
        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var("SMARTER_CONFIG") {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".smarter").join("config.yaml"))
    }
}
