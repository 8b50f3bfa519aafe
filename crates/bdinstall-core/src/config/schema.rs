//! Configuration schema for bdinstall.toml
//!
//! ```toml
//! [targets]
//! stable = "/Applications/Discord.app/Contents/Resources"
//!
//! [feed]
//! url = "https://api.github.com/repos/BetterDiscord/BetterDiscord/releases"
//! timeout_secs = 300
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::{Channel, InstallConfig};

pub const DEFAULT_RELEASE_FEED_URL: &str =
    "https://api.github.com/repos/BetterDiscord/BetterDiscord/releases";
pub const DEFAULT_ASSET_NAME: &str = "betterdiscord.asar";
pub const DEFAULT_USER_AGENT: &str = "BetterDiscord Installer";

/// Root configuration structure for bdinstall.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstallerSettings {
    /// Channel name to installation path. Overrides detected targets.
    #[serde(default)]
    pub targets: BTreeMap<String, PathBuf>,

    /// Release feed settings
    #[serde(default)]
    pub feed: FeedSettings,
}

impl InstallerSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        for name in self.targets.keys() {
            name.parse::<Channel>()
                .with_context(|| format!("Invalid [targets] entry '{}'", name))?;
        }
        self.feed.validate()
    }

    /// Configured targets as a typed install config.
    pub fn install_config(&self) -> anyhow::Result<InstallConfig> {
        let mut config = InstallConfig::new();
        for (name, path) in &self.targets {
            let channel: Channel = name
                .parse()
                .with_context(|| format!("Invalid [targets] entry '{}'", name))?;
            config.insert(channel, path.clone());
        }
        Ok(config)
    }
}

/// Where and how the loader package is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSettings {
    /// "List releases" endpoint returning a JSON array, newest first
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Asset file name. Matching lowercases both sides with full Unicode
    /// case mapping, so `BetterDiscord.asar` and `betterdiscord.asar` agree.
    #[serde(default = "default_asset_name")]
    pub asset_name: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout for feed and download requests
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            asset_name: default_asset_name(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl FeedSettings {
    /// Settings pointing at a different feed, everything else default.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let parsed = url::Url::parse(&self.url)
            .with_context(|| format!("Invalid release feed url: {}", self.url))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            anyhow::bail!(
                "Release feed url must use http or https, got '{}'",
                parsed.scheme()
            );
        }
        if self.asset_name.trim().is_empty() {
            anyhow::bail!("Release asset name must not be empty");
        }
        if self.timeout_secs == 0 || self.connect_timeout_secs == 0 {
            anyhow::bail!("Feed timeouts must be greater than zero");
        }
        Ok(())
    }
}

fn default_feed_url() -> String {
    DEFAULT_RELEASE_FEED_URL.to_string()
}

fn default_asset_name() -> String {
    DEFAULT_ASSET_NAME.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    30
}
