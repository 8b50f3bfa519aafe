//! Archive swap for nested-app bundles.
//!
//! `resources/app.asar` is renamed to `resources/discord.asar`. With the
//! original gone, Electron falls back to `resources/app/` where the shim
//! lives; the real application code stays reachable under the new name.

use std::path::Path;

use tracing::{info, warn};

use crate::error::StepError;
use crate::progress::StepProgress;

pub const ORIGINAL_ARCHIVE: &str = "app.asar";
pub const RENAMED_ARCHIVE: &str = "discord.asar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// `app.asar` was renamed.
    Swapped,
    /// A stale `discord.asar` was deleted first, then `app.asar` renamed.
    ReplacedStale,
    /// Only `discord.asar` exists; a previous run already did the swap.
    AlreadySwapped,
}

/// Swap the archive of one target.
pub fn swap_archive(target: &Path) -> Result<SwapOutcome, StepError> {
    let original = target.join(ORIGINAL_ARCHIVE);
    let renamed = target.join(RENAMED_ARCHIVE);

    let original_exists = original.exists();
    let renamed_exists = renamed.exists();

    if !original_exists && !renamed_exists {
        return Err(StepError::CorruptInstallation {
            path: target.to_path_buf(),
        });
    }
    if !original_exists {
        return Ok(SwapOutcome::AlreadySwapped);
    }

    let mut outcome = SwapOutcome::Swapped;
    if renamed_exists {
        std::fs::remove_file(&renamed).map_err(|source| StepError::SwapArchive {
            path: renamed.clone(),
            source,
        })?;
        outcome = SwapOutcome::ReplacedStale;
    }

    std::fs::rename(&original, &renamed).map_err(|source| StepError::SwapArchive {
        path: original.clone(),
        source,
    })?;

    Ok(outcome)
}

/// Swap archives of every target, in order, stopping at the first failure.
pub fn swap_archives(
    targets: &[&Path],
    progress: &mut StepProgress<'_>,
) -> Result<Vec<SwapOutcome>, StepError> {
    let mut outcomes = Vec::with_capacity(targets.len());

    for target in targets {
        let original = target.join(ORIGINAL_ARCHIVE);
        info!(path = %original.display(), "Renaming archive");
        match swap_archive(target) {
            Ok(outcome) => {
                info!(path = %target.display(), outcome = ?outcome, "Rename successful");
                outcomes.push(outcome);
                progress.tick();
            }
            Err(err) => {
                warn!(path = %original.display(), error = %err, "Could not rename asar");
                return Err(err);
            }
        }
    }

    Ok(outcomes)
}
