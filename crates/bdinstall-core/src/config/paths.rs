//! Data directory layout produced by the installer.

use std::path::{Path, PathBuf};

pub const DATA_ROOT_NAME: &str = "BetterDiscord";
pub const PACKAGE_FILE_NAME: &str = "betterdiscord.asar";

/// Locations under `<appData>/BetterDiscord` plus the pre-rename macOS root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
    data: PathBuf,
    plugins: PathBuf,
    themes: PathBuf,
    package: PathBuf,
    legacy_root: PathBuf,
}

impl DataLayout {
    pub fn new(app_data_dir: &Path, home_dir: &Path) -> Self {
        let root = app_data_dir.join(DATA_ROOT_NAME);
        let data = root.join("data");
        Self {
            plugins: root.join("plugins"),
            themes: root.join("themes"),
            package: data.join(PACKAGE_FILE_NAME),
            legacy_root: home_dir
                .join("Library")
                .join("Preferences")
                .join("betterdiscord"),
            data,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins
    }

    pub fn themes_dir(&self) -> &Path {
        &self.themes
    }

    /// Where the downloaded loader package lives.
    pub fn package_path(&self) -> &Path {
        &self.package
    }

    pub fn legacy_root(&self) -> &Path {
        &self.legacy_root
    }

    /// Directories to provision, parents first.
    pub fn directories(&self) -> Vec<PathBuf> {
        vec![
            self.root.clone(),
            self.data.clone(),
            self.themes.clone(),
            self.plugins.clone(),
        ]
    }

    /// `(old, new)` addon folder pairs for legacy migration, plugins first.
    pub fn legacy_addon_dirs(&self) -> [(PathBuf, PathBuf); 2] {
        [
            (self.legacy_root.join("plugins"), self.plugins.clone()),
            (self.legacy_root.join("themes"), self.themes.clone()),
        ]
    }
}
