//! Data directory provisioning.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::StepError;
use crate::progress::StepProgress;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub created: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
}

/// Create every directory in `dirs` that does not exist yet.
///
/// Directories are created one level at a time, so parents must come first.
/// Stops at the first failure; whatever was created before it stays.
pub fn provision_directories(
    dirs: &[PathBuf],
    progress: &mut StepProgress<'_>,
) -> Result<ProvisionReport, StepError> {
    let mut report = ProvisionReport::default();

    for dir in dirs {
        if dir.exists() {
            info!(path = %dir.display(), "Directory exists");
            report.existing.push(dir.clone());
            progress.tick();
            continue;
        }

        if let Err(source) = std::fs::create_dir(dir) {
            warn!(path = %dir.display(), error = %source, "Failed to create directory");
            return Err(StepError::CreateDirectory {
                path: dir.clone(),
                source,
            });
        }
        info!(path = %dir.display(), "Directory created");
        report.created.push(dir.clone());
        progress.tick();
    }

    Ok(report)
}
