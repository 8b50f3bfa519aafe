//! Pre-flight validation of the channel to path mapping.

use tracing::warn;

use bdinstall_core::orchestration::SanityCheck;
use bdinstall_core::types::InstallConfig;

/// Accepts a config with at least one target where every path is an
/// absolute, existing directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetSanityCheck;

impl SanityCheck for TargetSanityCheck {
    fn validate(&self, config: &InstallConfig) -> bool {
        if config.is_empty() {
            warn!("No Discord installation selected");
            return false;
        }

        let mut valid = true;
        for target in config.targets() {
            if !target.path.is_absolute() {
                warn!(channel = %target.channel, path = %target.path.display(), "Path is not absolute");
                valid = false;
            } else if !target.path.is_dir() {
                warn!(channel = %target.channel, path = %target.path.display(), "Path is not a directory");
                valid = false;
            }
        }
        valid
    }
}
