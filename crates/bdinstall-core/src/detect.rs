//! Detection of installed Discord channels at their default locations.
//!
//! | platform | target path |
//! |----------|-------------|
//! | Windows  | `%LOCALAPPDATA%/<Discord\|DiscordPTB\|DiscordCanary>/app-<version>/resources` |
//! | macOS    | `/Applications/<Discord\|Discord PTB\|Discord Canary>.app/Contents/Resources` |
//! | Linux    | `~/.config/<discord\|discordptb\|discordcanary>/<version>/modules/discord_desktop_core` |
//!
//! When several versions are installed side by side, the highest one wins.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::AppContext;
use crate::types::{Channel, InstallConfig, Platform};

/// Find every channel installed at its default location.
pub fn detect_targets(ctx: &AppContext) -> InstallConfig {
    Channel::ALL
        .into_iter()
        .filter_map(|channel| {
            let path = detect_channel(ctx, channel)?;
            debug!(channel = %channel, path = %path.display(), "Detected installation");
            Some((channel, path))
        })
        .collect()
}

/// Installation path of a single channel, if present.
pub fn detect_channel(ctx: &AppContext, channel: Channel) -> Option<PathBuf> {
    match ctx.platform() {
        Platform::Windows => {
            let base = ctx.local_data_dir().join(channel.process_name());
            let version_dir = latest_version_dir(&base, "app-")?;
            existing_dir(version_dir.join("resources"))
        }
        Platform::MacOs => existing_dir(
            ctx.applications_dir()
                .join(format!("{}.app", channel.display_name()))
                .join("Contents")
                .join("Resources"),
        ),
        Platform::Linux => {
            let base = ctx.app_data_dir().join(channel.linux_dir_name());
            let version_dir = latest_version_dir(&base, "")?;
            existing_dir(
                version_dir
                    .join("modules")
                    .join("discord_desktop_core"),
            )
        }
    }
}

fn existing_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}

/// Subdirectory of `base` named `<prefix><semver>` with the highest version.
fn latest_version_dir(base: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(base).ok()?;

    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let version = semver::Version::parse(name.strip_prefix(prefix)?).ok()?;
            Some((version, entry.path()))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, path)| path)
}
