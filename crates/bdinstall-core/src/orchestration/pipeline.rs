//! Installation pipeline orchestration.
//!
//! Runs the steps strictly in order against a fixed set of targets:
//!
//! 1. sanity check
//! 2. stop Discord (failure raises the kill notice)
//! 3. provision data directories
//! 4. legacy addon migration (macOS only, best-effort)
//! 5. fetch the loader package
//! 6. inject shims
//! 7. swap archives (nested-app layout only)
//! 8. restart Discord (failure raises the restart notice but is not fatal)
//!
//! The first fatal failure ends the run. Nothing is rolled back: every step
//! checks the filesystem before acting, so running the pipeline again
//! continues from wherever the previous run stopped.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::DataLayout;
use crate::context::AppContext;
use crate::error::{StepError, StepFailure, StepId, StepOutcome};
use crate::orchestration::collaborators::{Notices, ProcessController, SanityCheck};
use crate::progress::{
    CHECK_LEGACY_PROGRESS, DOWNLOAD_PACKAGE_PROGRESS, INJECT_SHIMS_PROGRESS,
    MAKE_DIRECTORIES_PROGRESS, ProgressSink, ProgressTracker, RESTART_PROCESSES_PROGRESS,
    STOP_PROCESSES_PROGRESS, SWAP_ARCHIVES_PROGRESS, TRANSFER_LEGACY_PROGRESS,
};
use crate::steps::{
    InstalledPackage, MigrationReport, PackageFetcher, ProvisionReport, ShimReport, SwapOutcome,
    find_legacy_install, inject_shims, migrate_legacy_addons, provision_directories,
    swap_archives,
};
use crate::types::{BundleLayout, InstallConfig, Platform};

/// External collaborators the pipeline calls into.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub processes: &'a dyn ProcessController,
    pub sanity: &'a dyn SanityCheck,
    pub notices: &'a dyn Notices,
}

/// Notices raised to the user during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Notice {
    Kill,
    Restart,
}

/// Terminal result of a run.
#[derive(Debug)]
pub enum PipelineResult {
    Succeeded,
    Failed(StepFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    pub step: StepId,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub result: PipelineResult,
    pub notices: Vec<Notice>,
    /// Steps that completed, in order.
    pub completed: Vec<StepRecord>,
    pub provisioned: Option<ProvisionReport>,
    pub migration: Option<MigrationReport>,
    pub package: Option<InstalledPackage>,
    pub shims: Option<ShimReport>,
    pub swaps: Vec<SwapOutcome>,
    pub progress: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.result, PipelineResult::Succeeded)
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match &self.result {
            PipelineResult::Succeeded => None,
            PipelineResult::Failed(failure) => Some(failure),
        }
    }

    pub fn has_notice(&self, notice: Notice) -> bool {
        self.notices.contains(&notice)
    }

    pub fn completed_steps(&self) -> Vec<StepId> {
        self.completed.iter().map(|r| r.step).collect()
    }
}

/// Report pieces collected while the run is in flight.
#[derive(Debug, Default)]
struct RunRecord {
    notices: Vec<Notice>,
    completed: Vec<StepRecord>,
    provisioned: Option<ProvisionReport>,
    migration: Option<MigrationReport>,
    package: Option<InstalledPackage>,
    shims: Option<ShimReport>,
    swaps: Vec<SwapOutcome>,
}

impl RunRecord {
    fn complete(&mut self, step: StepId, started: Instant) {
        self.completed.push(StepRecord {
            step,
            elapsed: started.elapsed(),
        });
    }
}

/// Sequences the installation steps over a set of targets.
pub struct InstallPipeline<'a> {
    platform: Platform,
    bundle: BundleLayout,
    layout: DataLayout,
    fetcher: PackageFetcher,
    collaborators: Collaborators<'a>,
    progress: ProgressTracker,
}

impl<'a> InstallPipeline<'a> {
    pub fn new(ctx: &AppContext, fetcher: PackageFetcher, collaborators: Collaborators<'a>) -> Self {
        let platform = ctx.platform();
        Self {
            platform,
            bundle: platform.bundle_layout(),
            layout: ctx.data_layout(),
            fetcher,
            collaborators,
            progress: ProgressTracker::new(),
        }
    }

    /// Report every progress change to `sink`.
    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.progress = ProgressTracker::with_sink(sink);
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn bundle_layout(&self) -> BundleLayout {
        self.bundle
    }

    pub fn data_layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn progress(&self) -> f64 {
        self.progress.get()
    }

    /// Run the whole pipeline once.
    pub async fn run(&mut self, config: &InstallConfig) -> PipelineReport {
        let started_at = Utc::now();
        let mut record = RunRecord::default();

        let result = match self.execute(config, &mut record).await {
            Ok(()) => {
                info!("Installation completed");
                PipelineResult::Succeeded
            }
            Err(failure) => {
                warn!(step = %failure.step, error = %failure.error, "Installation failed");
                PipelineResult::Failed(failure)
            }
        };

        PipelineReport {
            result,
            notices: record.notices,
            completed: record.completed,
            provisioned: record.provisioned,
            migration: record.migration,
            package: record.package,
            shims: record.shims,
            swaps: record.swaps,
            progress: self.progress.get(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn execute(
        &mut self,
        config: &InstallConfig,
        record: &mut RunRecord,
    ) -> StepOutcome {
        self.progress.reset();

        let started = Instant::now();
        info!("{}", StepId::SanityCheck.description());
        if !self.collaborators.sanity.validate(config) {
            return Err(StepFailure::new(StepId::SanityCheck, StepError::Rejected));
        }
        record.complete(StepId::SanityCheck, started);

        let channels = config.channels();
        let paths = config.paths();

        let started = Instant::now();
        info!("{}", StepId::StopProcesses.description());
        let mut step = self.progress.step(STOP_PROCESSES_PROGRESS, channels.len());
        if let Err(err) = self.collaborators.processes.stop(&channels, &mut step) {
            self.collaborators.notices.kill_notice();
            record.notices.push(Notice::Kill);
            return Err(StepFailure::new(
                StepId::StopProcesses,
                StepError::ProcessControl {
                    action: "stop",
                    message: format!("{err:#}"),
                },
            ));
        }
        step.finish();
        info!("Discord stopped");
        record.complete(StepId::StopProcesses, started);

        let started = Instant::now();
        info!("{}", StepId::ProvisionDirectories.description());
        let dirs = self.layout.directories();
        let mut step = self.progress.step(MAKE_DIRECTORIES_PROGRESS, dirs.len());
        let provisioned = provision_directories(&dirs, &mut step)
            .map_err(|e| StepFailure::new(StepId::ProvisionDirectories, e))?;
        step.finish();
        info!("Directories created");
        record.provisioned = Some(provisioned);
        record.complete(StepId::ProvisionDirectories, started);

        if self.platform.has_legacy_layout() {
            let started = Instant::now();
            info!("{}", StepId::MigrateLegacy.description());
            let legacy_root = self.layout.legacy_root();
            let found = find_legacy_install(legacy_root);
            self.progress.set(CHECK_LEGACY_PROGRESS);
            if found && self.collaborators.notices.confirm_legacy_migration(legacy_root) {
                record.migration = Some(migrate_legacy_addons(&self.layout));
                self.progress.set(TRANSFER_LEGACY_PROGRESS);
            }
            record.complete(StepId::MigrateLegacy, started);
        }

        let started = Instant::now();
        info!("{}", StepId::FetchPackage.description());
        let package = self
            .fetcher
            .fetch(self.layout.package_path())
            .await
            .map_err(|e| StepFailure::new(StepId::FetchPackage, e))?;
        self.progress.set(DOWNLOAD_PACKAGE_PROGRESS);
        info!("Package downloaded");
        record.package = Some(package);
        record.complete(StepId::FetchPackage, started);

        let started = Instant::now();
        info!("{}", StepId::InjectShims.description());
        let package_path: &Path = self.layout.package_path();
        let mut step = self.progress.step(INJECT_SHIMS_PROGRESS, paths.len());
        let shims = inject_shims(self.bundle, &paths, package_path, &mut step)
            .map_err(|e| StepFailure::new(StepId::InjectShims, e))?;
        step.finish();
        info!("Shims injected");
        record.shims = Some(shims);
        record.complete(StepId::InjectShims, started);

        if self.bundle.requires_archive_swap() {
            let started = Instant::now();
            info!("{}", StepId::SwapArchives.description());
            let mut step = self.progress.step(SWAP_ARCHIVES_PROGRESS, paths.len());
            let swaps = swap_archives(&paths, &mut step)
                .map_err(|e| StepFailure::new(StepId::SwapArchives, e))?;
            step.finish();
            info!("Asars renamed");
            record.swaps = swaps;
            record.complete(StepId::SwapArchives, started);
        }

        let started = Instant::now();
        info!("{}", StepId::RestartProcesses.description());
        let mut step = self.progress.step(RESTART_PROCESSES_PROGRESS, channels.len());
        match self.collaborators.processes.start(&channels, &mut step) {
            Ok(()) => info!("Discord restarted"),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "Could not restart Discord");
                self.collaborators.notices.restart_notice();
                record.notices.push(Notice::Restart);
            }
        }
        step.finish();
        record.complete(StepId::RestartProcesses, started);

        Ok(())
    }
}
