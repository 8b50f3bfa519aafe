//! Settings store for loading and saving bdinstall.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{InstallerSettings, parser};

pub const SETTINGS_FILE_NAME: &str = "bdinstall.toml";

#[derive(Debug, Clone)]
pub struct SettingsStore {
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn in_dir(dir: &Path) -> Self {
        Self::from_path(dir.join(SETTINGS_FILE_NAME))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load settings; a missing file yields defaults.
    pub fn load(&self) -> anyhow::Result<InstallerSettings> {
        if !self.config_path.exists() {
            return Ok(InstallerSettings::default());
        }
        parser::parse_settings_toml(&self.config_path)
    }

    pub fn save(&self, settings: &InstallerSettings) -> anyhow::Result<()> {
        let content = parser::to_toml(settings).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!("Failed to write config file: {}", self.config_path.display())
        })?;
        Ok(())
    }
}
