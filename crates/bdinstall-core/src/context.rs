//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use crate::config::{DataLayout, SettingsStore};
use crate::types::Platform;

/// Host directories and platform the installer works against.
///
/// Frontends create this once with [`AppContext::with_defaults`]; tests build
/// one over a temporary directory with [`AppContext::new`].
#[derive(Debug, Clone)]
pub struct AppContext {
    platform: Platform,
    home_dir: PathBuf,
    /// Roaming application data (`%APPDATA%`, `~/Library/Application Support`, `~/.config`).
    app_data_dir: PathBuf,
    /// Machine-local data (`%LOCALAPPDATA%` on Windows).
    local_data_dir: PathBuf,
    /// Where macOS application bundles are installed.
    applications_dir: PathBuf,
    global_config_dir: PathBuf,
}

impl AppContext {
    /// Create a context with explicit paths; the remaining directories are
    /// derived from `app_data_dir`.
    pub fn new(platform: Platform, home_dir: PathBuf, app_data_dir: PathBuf) -> Self {
        Self {
            platform,
            local_data_dir: app_data_dir.clone(),
            applications_dir: PathBuf::from("/Applications"),
            global_config_dir: app_data_dir.join("bdinstall"),
            home_dir,
            app_data_dir,
        }
    }

    /// Create a context for the current host.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        let app_data_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine application data directory"))?;
        let local_data_dir = dirs::data_local_dir().unwrap_or_else(|| app_data_dir.clone());

        Ok(Self::new(Platform::current(), home_dir, app_data_dir)
            .with_local_data_dir(local_data_dir))
    }

    pub fn with_local_data_dir(mut self, dir: PathBuf) -> Self {
        self.local_data_dir = dir;
        self
    }

    pub fn with_applications_dir(mut self, dir: PathBuf) -> Self {
        self.applications_dir = dir;
        self
    }

    pub fn with_global_config_dir(mut self, dir: PathBuf) -> Self {
        self.global_config_dir = dir;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }

    pub fn local_data_dir(&self) -> &Path {
        &self.local_data_dir
    }

    pub fn applications_dir(&self) -> &Path {
        &self.applications_dir
    }

    pub fn global_config_dir(&self) -> &Path {
        &self.global_config_dir
    }

    /// Get the BetterDiscord data layout for this host.
    pub fn data_layout(&self) -> DataLayout {
        DataLayout::new(&self.app_data_dir, &self.home_dir)
    }

    /// Get the SettingsStore for the global config directory.
    pub fn settings_store(&self) -> SettingsStore {
        SettingsStore::in_dir(&self.global_config_dir)
    }
}
