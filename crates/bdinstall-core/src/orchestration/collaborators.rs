//! Narrow interfaces to everything the pipeline does not own.
//!
//! Frontends (CLI, GUI) implement these; the pipeline only calls them.

use std::path::Path;

use crate::progress::StepProgress;
use crate::types::{Channel, InstallConfig};

/// Stops and relaunches running Discord instances.
pub trait ProcessController {
    /// Terminate every running instance of `channels`.
    ///
    /// May call `progress.tick()` once per channel handled.
    fn stop(&self, channels: &[Channel], progress: &mut StepProgress<'_>) -> anyhow::Result<()>;

    /// Relaunch `channels`.
    fn start(&self, channels: &[Channel], progress: &mut StepProgress<'_>) -> anyhow::Result<()>;
}

/// Decides whether a channel to path mapping is acceptable.
pub trait SanityCheck {
    fn validate(&self, config: &InstallConfig) -> bool;
}

impl<F> SanityCheck for F
where
    F: Fn(&InstallConfig) -> bool,
{
    fn validate(&self, config: &InstallConfig) -> bool {
        self(config)
    }
}

/// User-facing notices and the legacy migration prompt.
pub trait Notices {
    /// Discord could not be stopped; the install was aborted.
    fn kill_notice(&self);

    /// Discord could not be restarted; the install itself succeeded.
    fn restart_notice(&self);

    /// Ask whether addons found under `legacy_root` should be moved over.
    fn confirm_legacy_migration(&self, legacy_root: &Path) -> bool;
}
