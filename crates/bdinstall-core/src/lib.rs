//! bdinstall Core Library
//!
//! Patches installed Discord channels so they load the BetterDiscord loader
//! package at startup. Frontends drive the [`orchestration::InstallPipeline`]
//! and supply process control, dialogs and the sanity check through the
//! traits in [`orchestration::collaborators`].

pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod fs;
pub mod orchestration;
pub mod progress;
pub mod steps;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{DataLayout, FeedSettings, InstallerSettings, SettingsStore};
    pub use crate::context::AppContext;

    // Targets
    pub use crate::detect::detect_targets;
    pub use crate::types::{BundleLayout, Channel, InstallConfig, InstallationTarget, Platform};

    // Pipeline
    pub use crate::error::{FetchError, StepError, StepFailure, StepId, StepOutcome};
    pub use crate::orchestration::{
        Collaborators, InstallPipeline, Notice, Notices, PipelineReport, PipelineResult,
        ProcessController, SanityCheck,
    };
    pub use crate::progress::{ProgressSink, ProgressTracker, StepProgress};
    pub use crate::steps::PackageFetcher;
}
