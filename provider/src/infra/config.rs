//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::ports::ConfigStore;
use crate::domain::config::{ProviderConfig, RemoteEnv};

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "LXD_PROVIDER_CONFIG";

/// `ConfigStore` backed by a YAML file on disk.
#[derive(Debug, Clone, Default)]
pub struct YamlConfigStore {
    path: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Store reading `path`, or the default location when `None`.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ProviderConfig> {
        let path = self.path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ProviderConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".config").join("lxd-provider").join("config.yaml"))
    }
}

/// Read the `LXD_*` remote overrides from the process environment.
///
/// # Errors
///
/// Returns an error if a variable holds a value envy cannot decode.
pub fn remote_env() -> Result<RemoteEnv> {
    envy::prefixed("LXD_")
        .from_env::<RemoteEnv>()
        .context("cannot read LXD_* environment overrides")
}

/// Directory holding client and server certificates when none is configured.
///
/// Prefers the snap client's directory when it exists.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(config_dir_under(&home))
}

fn config_dir_under(home: &Path) -> PathBuf {
    let snap = home.join("snap").join("lxd").join("common").join("config");
    if snap.is_dir() {
        snap
    } else {
        home.join(".config").join("lxc")
    }
}
