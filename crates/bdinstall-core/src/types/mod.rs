//! Shared core types used across configuration, detection and the pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Release channels of the Discord desktop client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The regular release.
    Stable,
    /// Public test build.
    Ptb,
    /// Nightly-ish alpha build.
    Canary,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Stable, Channel::Ptb, Channel::Canary];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Ptb => "ptb",
            Channel::Canary => "canary",
        }
    }

    /// Human-facing product name, also the macOS bundle name.
    pub fn display_name(self) -> &'static str {
        match self {
            Channel::Stable => "Discord",
            Channel::Ptb => "Discord PTB",
            Channel::Canary => "Discord Canary",
        }
    }

    /// Executable name of a running instance (also the Windows install folder).
    pub fn process_name(self) -> &'static str {
        match self {
            Channel::Stable => "Discord",
            Channel::Ptb => "DiscordPTB",
            Channel::Canary => "DiscordCanary",
        }
    }

    /// Per-user data folder name on Linux.
    pub fn linux_dir_name(self) -> &'static str {
        match self {
            Channel::Stable => "discord",
            Channel::Ptb => "discordptb",
            Channel::Canary => "discordcanary",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" | "discord" => Ok(Channel::Stable),
            "ptb" => Ok(Channel::Ptb),
            "canary" => Ok(Channel::Canary),
            other => anyhow::bail!("Unknown channel: {}. Use 'stable', 'ptb' or 'canary'", other),
        }
    }
}

/// A channel paired with the installation path the pipeline patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallationTarget {
    pub channel: Channel,
    pub path: PathBuf,
}

/// Channel to installation path mapping for one pipeline run.
///
/// Backed by an ordered map, so every channel appears at most once and
/// iteration order is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallConfig {
    targets: BTreeMap<Channel, PathBuf>,
}

impl InstallConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_target(mut self, channel: Channel, path: impl Into<PathBuf>) -> Self {
        self.insert(channel, path);
        self
    }

    /// Insert or replace the path for a channel, returning the previous one.
    pub fn insert(&mut self, channel: Channel, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.targets.insert(channel, path.into())
    }

    pub fn get(&self, channel: Channel) -> Option<&Path> {
        self.targets.get(&channel).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.targets.keys().copied().collect()
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.targets.values().map(PathBuf::as_path).collect()
    }

    pub fn targets(&self) -> Vec<InstallationTarget> {
        self.targets
            .iter()
            .map(|(channel, path)| InstallationTarget {
                channel: *channel,
                path: path.clone(),
            })
            .collect()
    }

    /// Overlay `other` on top of this config; entries in `other` win.
    pub fn merge(&mut self, other: InstallConfig) {
        self.targets.extend(other.targets);
    }
}

impl FromIterator<(Channel, PathBuf)> for InstallConfig {
    fn from_iter<I: IntoIterator<Item = (Channel, PathBuf)>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

/// Host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// The platform this binary was compiled for. Unknown unixes are treated as Linux.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    pub fn bundle_layout(self) -> BundleLayout {
        match self {
            Platform::Windows | Platform::MacOs => BundleLayout::NestedApp,
            Platform::Linux => BundleLayout::Flat,
        }
    }

    /// Only macOS ever had the `~/Library/Preferences/betterdiscord` layout.
    pub fn has_legacy_layout(self) -> bool {
        matches!(self, Platform::MacOs)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the target application's resources are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleLayout {
    /// `resources/app.asar` plus a writable `resources/app/` folder that wins
    /// once the archive is renamed away.
    NestedApp,
    /// `discord_desktop_core/core.asar` loaded through an `index.js` next to it.
    Flat,
}

impl BundleLayout {
    pub fn requires_archive_swap(self) -> bool {
        matches!(self, BundleLayout::NestedApp)
    }
}
