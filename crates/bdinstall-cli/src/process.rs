//! Stopping and relaunching Discord through the host's process tools.
//!
//! - Windows: `taskkill /F /IM <name>.exe`, relaunch via the channel's
//!   `Update.exe --processStart`.
//! - macOS: `pkill -x <bundle name>`, relaunch with `open -a`.
//! - Linux: `pkill -x <name>`, relaunch the channel's launcher from `PATH`.
//!
//! Only channels that were actually running get relaunched.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use bdinstall_core::context::AppContext;
use bdinstall_core::orchestration::ProcessController;
use bdinstall_core::progress::StepProgress;
use bdinstall_core::types::{Channel, Platform};

/// `pkill` exit status when no process matched.
const PKILL_NO_MATCH: i32 = 1;
/// `taskkill` exit status when no process matched.
const TASKKILL_NO_MATCH: i32 = 128;

pub struct SystemProcessController {
    platform: Platform,
    local_data_dir: PathBuf,
    restart: bool,
    stopped: Mutex<Vec<Channel>>,
}

impl SystemProcessController {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            platform: ctx.platform(),
            local_data_dir: ctx.local_data_dir().to_path_buf(),
            restart: true,
            stopped: Mutex::new(Vec::new()),
        }
    }

    /// Skip relaunching after the install.
    pub fn with_restart(mut self, restart: bool) -> Self {
        self.restart = restart;
        self
    }

    /// Name the process is listed under.
    fn process_name(&self, channel: Channel) -> String {
        match self.platform {
            Platform::Windows => format!("{}.exe", channel.process_name()),
            Platform::MacOs => channel.display_name().to_string(),
            Platform::Linux => channel.process_name().to_string(),
        }
    }

    fn kill_command(&self, channel: Channel) -> Command {
        let name = self.process_name(channel);
        match self.platform {
            Platform::Windows => {
                let mut cmd = Command::new("taskkill");
                cmd.args(["/F", "/IM", name.as_str()]);
                cmd
            }
            Platform::MacOs | Platform::Linux => {
                let mut cmd = Command::new("pkill");
                cmd.args(["-x", name.as_str()]);
                cmd
            }
        }
    }

    fn launch_command(&self, channel: Channel) -> Command {
        match self.platform {
            Platform::Windows => {
                let update = self
                    .local_data_dir
                    .join(channel.process_name())
                    .join("Update.exe");
                let mut cmd = Command::new(update);
                let exe = format!("{}.exe", channel.process_name());
                cmd.args(["--processStart", exe.as_str()]);
                cmd
            }
            Platform::MacOs => {
                let mut cmd = Command::new("open");
                cmd.args(["-a", channel.display_name()]);
                cmd
            }
            Platform::Linux => Command::new(linux_launcher(channel)),
        }
    }

    /// Kill one channel. Returns whether it was running.
    fn kill(&self, channel: Channel) -> Result<bool> {
        let mut cmd = self.kill_command(channel);
        let output = cmd
            .output()
            .with_context(|| format!("Failed to run {:?}", cmd.get_program()))?;

        let no_match = match self.platform {
            Platform::Windows => TASKKILL_NO_MATCH,
            Platform::MacOs | Platform::Linux => PKILL_NO_MATCH,
        };
        match output.status.code() {
            Some(0) => Ok(true),
            Some(code) if code == no_match => Ok(false),
            _ => anyhow::bail!(
                "Could not stop {}: {}",
                channel.display_name(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }
}

impl ProcessController for SystemProcessController {
    fn stop(&self, channels: &[Channel], progress: &mut StepProgress<'_>) -> Result<()> {
        let mut stopped = Vec::new();
        for &channel in channels {
            if self.kill(channel)? {
                info!(channel = %channel, "Stopped {}", channel.display_name());
                stopped.push(channel);
            } else {
                debug!(channel = %channel, "Not running");
            }
            progress.tick();
        }

        if !stopped.is_empty() {
            // Give the OS a moment to release file handles on the bundle.
            std::thread::sleep(Duration::from_millis(500));
        }
        if let Ok(mut guard) = self.stopped.lock() {
            *guard = stopped;
        }
        Ok(())
    }

    fn start(&self, channels: &[Channel], progress: &mut StepProgress<'_>) -> Result<()> {
        if !self.restart {
            debug!("Restart disabled");
            return Ok(());
        }

        let stopped = self
            .stopped
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        for &channel in channels {
            if stopped.contains(&channel) {
                let mut cmd = self.launch_command(channel);
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .with_context(|| format!("Failed to relaunch {}", channel.display_name()))?;
                info!(channel = %channel, "Relaunched {}", channel.display_name());
            }
            progress.tick();
        }
        Ok(())
    }
}

/// Launcher binary installed by the Linux packages.
fn linux_launcher(channel: Channel) -> &'static str {
    match channel {
        Channel::Stable => "discord",
        Channel::Ptb => "discord-ptb",
        Channel::Canary => "discord-canary",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn controller(platform: Platform) -> SystemProcessController {
        let ctx = AppContext::new(platform, PathBuf::from("/home/u"), PathBuf::from("/appdata"))
            .with_local_data_dir(PathBuf::from("/local"));
        SystemProcessController::new(&ctx)
    }

    #[test]
    fn test_process_names_per_platform() {
        assert_eq!(
            controller(Platform::Windows).process_name(Channel::Ptb),
            "DiscordPTB.exe"
        );
        assert_eq!(
            controller(Platform::MacOs).process_name(Channel::Canary),
            "Discord Canary"
        );
        assert_eq!(
            controller(Platform::Linux).process_name(Channel::Stable),
            "Discord"
        );
    }

    #[test]
    fn test_windows_relaunch_uses_update_exe() {
        let cmd = controller(Platform::Windows).launch_command(Channel::Canary);
        assert_eq!(
            Path::new(cmd.get_program()),
            Path::new("/local/DiscordCanary/Update.exe")
        );
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["--processStart", "DiscordCanary.exe"]);
    }

    #[test]
    fn test_macos_relaunch_opens_bundle() {
        let cmd = controller(Platform::MacOs).launch_command(Channel::Ptb);
        assert_eq!(cmd.get_program(), "open");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["-a", "Discord PTB"]);
    }

    #[test]
    fn test_kill_command_matches_exact_name() {
        let cmd = controller(Platform::Linux).kill_command(Channel::Canary);
        assert_eq!(cmd.get_program(), "pkill");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["-x", "DiscordCanary"]);
    }
}
