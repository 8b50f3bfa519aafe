//! Migration of addons from the old macOS data folder.
//!
//! Best-effort: items that cannot be moved are logged and left behind, and
//! nothing here can fail the pipeline.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::DataLayout;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Destination paths of files that were moved.
    pub moved: Vec<PathBuf>,
    /// Entries left alone because they are not regular files.
    pub skipped: Vec<PathBuf>,
    /// Files whose move failed.
    pub failed: Vec<PathBuf>,
}

impl MigrationReport {
    fn absorb(&mut self, other: MigrationReport) {
        self.moved.extend(other.moved);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

pub fn find_legacy_install(legacy_root: &Path) -> bool {
    if legacy_root.exists() {
        warn!(path = %legacy_root.display(), "Found old BD installation");
        return true;
    }
    false
}

/// Move every regular file directly inside `old_dir` into `new_dir`.
///
/// Subdirectories are not descended into. Entries are handled in name order.
pub fn transfer_addons(old_dir: &Path, new_dir: &Path) -> MigrationReport {
    let mut report = MigrationReport::default();

    let entries = match std::fs::read_dir(old_dir) {
        Ok(entries) => entries,
        Err(err) => {
            if old_dir.exists() {
                warn!(path = %old_dir.display(), error = %err, "Failed to read old addon folder");
            }
            return report;
        }
    };

    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let old_path = entry.path();
        let is_file = std::fs::metadata(&old_path)
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            report.skipped.push(old_path);
            continue;
        }

        let new_path = new_dir.join(entry.file_name());
        match std::fs::rename(&old_path, &new_path) {
            Ok(()) => {
                info!(from = %old_path.display(), to = %new_path.display(), "Transferred addon");
                report.moved.push(new_path);
            }
            Err(err) => {
                warn!(
                    name = %entry.file_name().to_string_lossy(),
                    error = %err,
                    "Failed to transfer addon"
                );
                report.failed.push(old_path);
            }
        }
    }

    report
}

/// Transfer plugins, then themes, from the legacy root into `layout`.
pub fn migrate_legacy_addons(layout: &DataLayout) -> MigrationReport {
    let mut report = MigrationReport::default();
    for (old_dir, new_dir) in layout.legacy_addon_dirs() {
        report.absorb(transfer_addons(&old_dir, &new_dir));
    }
    info!(
        moved = report.moved.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Legacy addon transfer finished"
    );
    report
}
