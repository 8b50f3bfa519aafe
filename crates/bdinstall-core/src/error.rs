//! Typed step failures.
//!
//! Every pipeline step returns `Result<_, StepError>`; the orchestrator tags a
//! failure with the step it came from and decides whether it is fatal.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Identity of a pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    SanityCheck,
    StopProcesses,
    ProvisionDirectories,
    MigrateLegacy,
    FetchPackage,
    InjectShims,
    SwapArchives,
    RestartProcesses,
}

impl StepId {
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::SanityCheck => "sanity-check",
            StepId::StopProcesses => "stop-processes",
            StepId::ProvisionDirectories => "provision-directories",
            StepId::MigrateLegacy => "migrate-legacy",
            StepId::FetchPackage => "fetch-package",
            StepId::InjectShims => "inject-shims",
            StepId::SwapArchives => "swap-archives",
            StepId::RestartProcesses => "restart-processes",
        }
    }

    /// Narration line logged when the step starts.
    pub fn description(self) -> &'static str {
        match self {
            StepId::SanityCheck => "Checking configuration...",
            StepId::StopProcesses => "Stopping Discord...",
            StepId::ProvisionDirectories => "Creating required directories...",
            StepId::MigrateLegacy => "Checking for old MacOS installation...",
            StepId::FetchPackage => "Downloading asar file...",
            StepId::InjectShims => "Injecting shims...",
            StepId::SwapArchives => "Renaming asars...",
            StepId::RestartProcesses => "Restarting Discord...",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("Installation configuration was rejected")]
    Rejected,

    #[error("Failed to {action} Discord: {message}")]
    ProcessControl {
        action: &'static str,
        message: String,
    },

    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Could not inject shims to {}: {source}", .path.display())]
    InjectShim {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Discord installation corrupt, please reinstall. Missing archive in {}", .path.display())]
    CorruptInstallation { path: PathBuf },

    #[error("Could not rename asar {}: {source}", .path.display())]
    SwapArchive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why the loader package could not be resolved or stored.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Could not get any response from {url}: {reason}")]
    NoResponse { url: String, reason: String },

    #[error("Could not get response body from {url}: {reason}")]
    NoBody { url: String, reason: String },

    #[error("Could not get asset object named {asset} from {url}")]
    NoMatchingAsset { url: String, asset: String },

    #[error("Could not get the asset url for {asset}")]
    NoDownloadUrl { asset: String },

    #[error("Failed to download package from {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Failed to write package from {url} to {}: {source}", .path.display())]
    Write {
        url: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A failed step together with its identity.
#[derive(Debug, Error)]
#[error("{step} failed: {error}")]
pub struct StepFailure {
    pub step: StepId,
    #[source]
    pub error: StepError,
}

impl StepFailure {
    pub fn new(step: StepId, error: impl Into<StepError>) -> Self {
        Self {
            step,
            error: error.into(),
        }
    }

    /// Human-readable message for notices and logs.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Outcome of a single step as seen by the orchestrator.
pub type StepOutcome = Result<(), StepFailure>;
