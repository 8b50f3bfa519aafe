//! Shim injection.
//!
//! The shim is the small piece of JavaScript that makes Discord load the
//! downloaded package before its own code. Where it goes depends on the
//! bundle layout:
//!
//! - [`BundleLayout::NestedApp`]: `resources/app/package.json` declaring
//!   `index.js` as entry point, and `resources/app/index.js` requiring the
//!   package. Electron only picks `app/` up once `app.asar` is renamed away.
//! - [`BundleLayout::Flat`]: `discord_desktop_core/index.js` requiring the
//!   package and then re-exporting `./core.asar`, so the original load chain
//!   keeps working.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StepError;
use crate::fs::write_if_changed;
use crate::progress::StepProgress;
use crate::types::BundleLayout;

pub const SHIM_ENTRY_FILE: &str = "index.js";
pub const SHIM_MANIFEST_FILE: &str = "package.json";
pub const SHIM_APP_DIR: &str = "app";

/// `package.json` making `index.js` the application entry point.
pub const SHIM_MANIFEST: &str = r#"{"name":"betterdiscord","main":"index.js"}"#;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShimReport {
    /// Files that were created or rewritten.
    pub written: Vec<PathBuf>,
    /// Files that already had the right content.
    pub unchanged: Vec<PathBuf>,
}

/// Escape a path for embedding inside a double-quoted JavaScript string.
pub fn escape_js_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `require("<package>");`
pub fn require_statement(package: &Path) -> String {
    format!(
        "require(\"{}\");",
        escape_js_string(&package.to_string_lossy())
    )
}

/// Entry-point source for the given layout.
pub fn shim_source(layout: BundleLayout, package: &Path) -> String {
    match layout {
        BundleLayout::NestedApp => require_statement(package),
        BundleLayout::Flat => format!(
            "{}\nmodule.exports = require(\"./core.asar\");",
            require_statement(package)
        ),
    }
}

fn record(report: &mut ShimReport, path: PathBuf, written: bool) {
    if written {
        report.written.push(path);
    } else {
        report.unchanged.push(path);
    }
}

/// Write the shim for a single target.
pub fn inject_shim(
    layout: BundleLayout,
    target: &Path,
    package: &Path,
    report: &mut ShimReport,
) -> std::io::Result<()> {
    match layout {
        BundleLayout::NestedApp => {
            let app_dir = target.join(SHIM_APP_DIR);
            if !app_dir.exists() {
                std::fs::create_dir(&app_dir)?;
            }
            let manifest = app_dir.join(SHIM_MANIFEST_FILE);
            let changed = write_if_changed(&manifest, SHIM_MANIFEST.as_bytes())?;
            record(report, manifest, changed);

            let entry = app_dir.join(SHIM_ENTRY_FILE);
            let changed = write_if_changed(&entry, shim_source(layout, package).as_bytes())?;
            record(report, entry, changed);
        }
        BundleLayout::Flat => {
            let entry = target.join(SHIM_ENTRY_FILE);
            let changed = write_if_changed(&entry, shim_source(layout, package).as_bytes())?;
            record(report, entry, changed);
        }
    }
    Ok(())
}

/// Inject shims into every target, in order, stopping at the first failure.
pub fn inject_shims(
    layout: BundleLayout,
    targets: &[&Path],
    package: &Path,
    progress: &mut StepProgress<'_>,
) -> Result<ShimReport, StepError> {
    let mut report = ShimReport::default();

    for target in targets {
        info!(path = %target.display(), "Injecting into target");
        if let Err(source) = inject_shim(layout, target, package, &mut report) {
            warn!(path = %target.display(), error = %source, "Could not inject shims");
            return Err(StepError::InjectShim {
                path: target.to_path_buf(),
                source,
            });
        }
        info!(path = %target.display(), "Injection successful");
        progress.tick();
    }

    Ok(report)
}
