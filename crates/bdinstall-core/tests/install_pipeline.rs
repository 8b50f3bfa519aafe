//! End-to-end pipeline runs against a sandboxed filesystem and a mock feed.

mod support;

use bdinstall_core::config::FeedSettings;
use bdinstall_core::context::AppContext;
use bdinstall_core::error::{StepError, StepId};
use bdinstall_core::orchestration::{Collaborators, InstallPipeline, Notice, SanityCheck};
use bdinstall_core::steps::archive::{ORIGINAL_ARCHIVE, RENAMED_ARCHIVE};
use bdinstall_core::steps::{PackageFetcher, SwapOutcome};
use bdinstall_core::types::{BundleLayout, Channel, InstallConfig, Platform};
use support::{
    FakeProcesses, PACKAGE_BYTES, RecordingNotices, Sandbox, feed_url, mount_feed, recording_sink,
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn accept_all(_: &InstallConfig) -> bool {
    true
}

fn collaborators<'a>(
    processes: &'a FakeProcesses,
    sanity: &'a dyn SanityCheck,
    notices: &'a RecordingNotices,
) -> Collaborators<'a> {
    Collaborators {
        processes,
        sanity,
        notices,
    }
}

async fn feed_server() -> MockServer {
    let server = MockServer::start().await;
    mount_feed(&server, PACKAGE_BYTES).await;
    server
}

fn fetcher(server: &MockServer) -> PackageFetcher {
    PackageFetcher::new(FeedSettings::with_url(feed_url(server))).unwrap()
}

fn assert_monotonic(values: &[f64]) {
    // The first value is the reset to zero at the start of the run.
    for pair in values[1..].windows(2) {
        assert!(pair[0] < pair[1], "progress went backwards: {values:?}");
    }
}

#[tokio::test]
async fn flat_layout_install_succeeds() {
    let sandbox = Sandbox::new();
    let stable = sandbox.flat_target("discord");
    let canary = sandbox.flat_target("discordcanary");
    let config = InstallConfig::new()
        .with_target(Channel::Stable, &stable)
        .with_target(Channel::Canary, &canary);

    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Linux);
    let (sink, seen) = recording_sink();

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    )
    .with_progress_sink(sink);
    assert_eq!(pipeline.bundle_layout(), BundleLayout::Flat);

    let report = pipeline.run(&config).await;

    assert!(report.succeeded(), "{:?}", report.failure());
    assert_eq!(report.progress, 100.0);
    assert!(report.notices.is_empty());
    assert_eq!(
        report.completed_steps(),
        vec![
            StepId::SanityCheck,
            StepId::StopProcesses,
            StepId::ProvisionDirectories,
            StepId::FetchPackage,
            StepId::InjectShims,
            StepId::RestartProcesses,
        ]
    );
    assert_eq!(processes.calls(), vec!["stop", "start"]);

    let layout = ctx.data_layout();
    assert_eq!(std::fs::read(layout.package_path()).unwrap(), PACKAGE_BYTES);
    for target in [&stable, &canary] {
        let entry = std::fs::read_to_string(target.join("index.js")).unwrap();
        assert!(entry.contains("betterdiscord.asar"));
        assert!(entry.ends_with("module.exports = require(\"./core.asar\");"));
    }

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&0.0));
    assert_eq!(seen.last(), Some(&100.0));
    assert_monotonic(&seen);
    assert!(seen.contains(&20.0));
    assert!(seen.contains(&60.0));
    assert!(seen.contains(&80.0));
}

#[tokio::test]
async fn nested_layout_install_swaps_archives() {
    let sandbox = Sandbox::new();
    let stable = sandbox.nested_target("Discord");
    let config = InstallConfig::new().with_target(Channel::Stable, &stable);

    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::accepting();
    let ctx = sandbox.context(Platform::Windows);

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let report = pipeline.run(&config).await;

    assert!(report.succeeded(), "{:?}", report.failure());
    assert_eq!(report.swaps, vec![SwapOutcome::Swapped]);
    assert!(report.completed_steps().contains(&StepId::SwapArchives));
    assert!(!report.completed_steps().contains(&StepId::MigrateLegacy));
    assert!(notices.prompts().is_empty());

    assert!(!stable.join(ORIGINAL_ARCHIVE).exists());
    assert!(stable.join(RENAMED_ARCHIVE).is_file());
    assert!(stable.join("app").join("package.json").is_file());
    let entry = std::fs::read_to_string(stable.join("app").join("index.js")).unwrap();
    assert!(entry.starts_with("require(\""));
    assert_eq!(pipeline.progress(), 100.0);
}

#[tokio::test]
async fn macos_install_migrates_legacy_addons_when_confirmed() {
    let sandbox = Sandbox::new();
    let stable = sandbox.nested_target("Discord.app");
    let legacy = sandbox.legacy_root();
    std::fs::create_dir_all(legacy.join("plugins")).unwrap();
    std::fs::write(legacy.join("plugins").join("a.plugin.js"), "a").unwrap();

    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::accepting();
    let ctx = sandbox.context(Platform::MacOs);
    let (sink, seen) = recording_sink();

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    )
    .with_progress_sink(sink);
    let report = pipeline
        .run(&InstallConfig::new().with_target(Channel::Stable, &stable))
        .await;

    assert!(report.succeeded(), "{:?}", report.failure());
    assert_eq!(notices.prompts(), vec![legacy.clone()]);
    let migration = report.migration.expect("migration report");
    assert_eq!(migration.moved.len(), 1);
    assert!(ctx.data_layout().plugins_dir().join("a.plugin.js").is_file());

    let seen = seen.lock().unwrap().clone();
    assert!(seen.contains(&30.0));
    assert!(seen.contains(&40.0));
    assert_monotonic(&seen);
}

#[tokio::test]
async fn declined_migration_leaves_legacy_files() {
    let sandbox = Sandbox::new();
    let stable = sandbox.nested_target("Discord.app");
    let legacy = sandbox.legacy_root();
    std::fs::create_dir_all(legacy.join("themes")).unwrap();
    std::fs::write(legacy.join("themes").join("t.theme.css"), "t").unwrap();

    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::MacOs);

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let report = pipeline
        .run(&InstallConfig::new().with_target(Channel::Stable, &stable))
        .await;

    assert!(report.succeeded());
    assert_eq!(notices.prompts().len(), 1);
    assert!(report.migration.is_none());
    assert!(legacy.join("themes").join("t.theme.css").is_file());
}

#[tokio::test]
async fn rejected_config_stops_before_anything_runs() {
    let sandbox = Sandbox::new();
    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Linux);
    let reject_empty = |config: &InstallConfig| !config.is_empty();

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &reject_empty, &notices),
    );
    let report = pipeline.run(&InstallConfig::new()).await;

    let failure = report.failure().expect("run should fail");
    assert_eq!(failure.step, StepId::SanityCheck);
    assert!(matches!(failure.error, StepError::Rejected));
    assert!(processes.calls().is_empty());
    assert!(report.completed.is_empty());
    assert!(!ctx.data_layout().root().exists());
    assert_eq!(report.progress, 0.0);
}

#[tokio::test]
async fn stop_failure_raises_kill_notice_and_aborts() {
    let sandbox = Sandbox::new();
    let stable = sandbox.flat_target("discord");
    let server = feed_server().await;
    let processes = FakeProcesses::failing_stop();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Linux);

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let report = pipeline
        .run(&InstallConfig::new().with_target(Channel::Stable, &stable))
        .await;

    let failure = report.failure().expect("run should fail");
    assert_eq!(failure.step, StepId::StopProcesses);
    assert!(failure.message().contains("access denied"));
    assert_eq!(report.notices, vec![Notice::Kill]);
    assert_eq!(notices.kills(), 1);
    assert_eq!(processes.calls(), vec!["stop"]);
    assert!(!ctx.data_layout().root().exists());
    assert!(report.progress < 100.0);
}

#[tokio::test]
async fn restart_failure_still_succeeds_with_notice() {
    let sandbox = Sandbox::new();
    let stable = sandbox.flat_target("discord");
    let server = feed_server().await;
    let processes = FakeProcesses::failing_start();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Linux);

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let report = pipeline
        .run(&InstallConfig::new().with_target(Channel::Stable, &stable))
        .await;

    assert!(report.succeeded());
    assert!(report.has_notice(Notice::Restart));
    assert!(!report.has_notice(Notice::Kill));
    assert_eq!(notices.restarts(), 1);
    assert_eq!(report.progress, 100.0);
}

#[tokio::test]
async fn corrupt_install_fails_at_archive_swap() {
    let sandbox = Sandbox::new();
    let stable = sandbox.nested_target("Discord");
    std::fs::remove_file(stable.join(ORIGINAL_ARCHIVE)).unwrap();

    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Windows);

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let report = pipeline
        .run(&InstallConfig::new().with_target(Channel::Stable, &stable))
        .await;

    let failure = report.failure().expect("run should fail");
    assert_eq!(failure.step, StepId::SwapArchives);
    assert!(failure.message().contains("please reinstall"));
    assert_eq!(report.progress, 80.0);
    assert_eq!(processes.calls(), vec!["stop"]);
}

#[tokio::test]
async fn rerun_after_failed_download_converges() {
    let sandbox = Sandbox::new();
    let stable = sandbox.nested_target("Discord");
    let config = InstallConfig::new().with_target(Channel::Stable, &stable);
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Windows);

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;
    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&broken),
        collaborators(&processes, &accept_all, &notices),
    );
    let first = pipeline.run(&config).await;

    let failure = first.failure().expect("first run should fail");
    assert_eq!(failure.step, StepId::FetchPackage);
    assert_eq!(first.progress, 20.0);
    assert!(ctx.data_layout().data_dir().is_dir());
    assert!(stable.join(ORIGINAL_ARCHIVE).exists());
    assert!(!stable.join("app").exists());

    let server = feed_server().await;
    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let second = pipeline.run(&config).await;
    assert!(second.succeeded(), "{:?}", second.failure());
    assert_eq!(second.swaps, vec![SwapOutcome::Swapped]);

    let third = pipeline.run(&config).await;
    assert!(third.succeeded(), "{:?}", third.failure());
    assert_eq!(third.swaps, vec![SwapOutcome::AlreadySwapped]);
    assert!(third.package.as_ref().is_some_and(|p| p.unchanged));
    assert!(third.shims.as_ref().is_some_and(|s| s.written.is_empty()));
    assert_eq!(third.provisioned.as_ref().map(|p| p.created.len()), Some(0));
}

#[tokio::test]
async fn rerun_after_failed_provisioning_converges() {
    let sandbox = Sandbox::new();
    let stable = sandbox.flat_target("discord");
    let config = InstallConfig::new().with_target(Channel::Stable, &stable);
    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();

    // The data root's parent is missing, so the first directory cannot be made.
    let app_data = sandbox.temp.path().join("missing").join("appdata");
    let ctx = AppContext::new(Platform::Linux, sandbox.home.clone(), app_data.clone());

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let first = pipeline.run(&config).await;

    let failure = first.failure().expect("first run should fail");
    assert_eq!(failure.step, StepId::ProvisionDirectories);
    assert!(matches!(failure.error, StepError::CreateDirectory { .. }));
    assert!(first.progress <= 10.0);
    assert!(!ctx.data_layout().package_path().exists());
    let entry = std::fs::read_to_string(stable.join("index.js")).unwrap();
    assert!(!entry.contains("betterdiscord.asar"));

    std::fs::create_dir_all(&app_data).unwrap();
    let second = pipeline.run(&config).await;
    assert!(second.succeeded(), "{:?}", second.failure());
    assert_eq!(second.provisioned.as_ref().map(|p| p.created.len()), Some(4));
    assert_eq!(
        std::fs::read(ctx.data_layout().package_path()).unwrap(),
        PACKAGE_BYTES
    );

    let third = pipeline.run(&config).await;
    assert!(third.succeeded(), "{:?}", third.failure());
    assert!(third.provisioned.as_ref().is_some_and(|p| p.created.is_empty()));
    assert!(third.shims.as_ref().is_some_and(|s| s.written.is_empty()));
}

#[tokio::test]
async fn rerun_after_failed_shim_injection_converges() {
    let sandbox = Sandbox::new();
    let stable = sandbox.nested_target("Discord");
    // A plain file where the shim directory belongs.
    std::fs::write(stable.join("app"), b"not a directory").unwrap();
    let config = InstallConfig::new().with_target(Channel::Stable, &stable);

    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Windows);

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let first = pipeline.run(&config).await;

    let failure = first.failure().expect("first run should fail");
    assert_eq!(failure.step, StepId::InjectShims);
    assert!(matches!(failure.error, StepError::InjectShim { .. }));
    assert_eq!(first.progress, 60.0);
    assert!(ctx.data_layout().package_path().is_file());
    assert!(stable.join(ORIGINAL_ARCHIVE).exists());
    assert!(!stable.join(RENAMED_ARCHIVE).exists());

    std::fs::remove_file(stable.join("app")).unwrap();
    let second = pipeline.run(&config).await;
    assert!(second.succeeded(), "{:?}", second.failure());
    assert_eq!(second.swaps, vec![SwapOutcome::Swapped]);
    assert!(second.package.as_ref().is_some_and(|p| p.unchanged));
    assert!(second.provisioned.as_ref().is_some_and(|p| p.created.is_empty()));
    assert_eq!(second.shims.as_ref().map(|s| s.written.len()), Some(2));

    let third = pipeline.run(&config).await;
    assert!(third.succeeded(), "{:?}", third.failure());
    assert_eq!(third.swaps, vec![SwapOutcome::AlreadySwapped]);
    assert!(third.shims.as_ref().is_some_and(|s| s.written.is_empty()));
}

#[tokio::test]
async fn rerun_after_partial_archive_swap_converges() {
    let sandbox = Sandbox::new();
    let stable = sandbox.nested_target("Discord");
    let canary = sandbox.nested_target("DiscordCanary");
    std::fs::remove_file(canary.join(ORIGINAL_ARCHIVE)).unwrap();
    let config = InstallConfig::new()
        .with_target(Channel::Stable, &stable)
        .with_target(Channel::Canary, &canary);

    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Windows);

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let first = pipeline.run(&config).await;

    let failure = first.failure().expect("first run should fail");
    assert_eq!(failure.step, StepId::SwapArchives);
    assert!(matches!(failure.error, StepError::CorruptInstallation { .. }));
    assert!(stable.join(RENAMED_ARCHIVE).is_file());
    assert!(!stable.join(ORIGINAL_ARCHIVE).exists());

    std::fs::write(canary.join(ORIGINAL_ARCHIVE), b"original asar").unwrap();
    let second = pipeline.run(&config).await;
    assert!(second.succeeded(), "{:?}", second.failure());
    assert_eq!(
        second.swaps,
        vec![SwapOutcome::AlreadySwapped, SwapOutcome::Swapped]
    );
    assert!(second.shims.as_ref().is_some_and(|s| s.written.is_empty()));
    assert!(second.provisioned.as_ref().is_some_and(|p| p.created.is_empty()));
    assert!(second.package.as_ref().is_some_and(|p| p.unchanged));
    for target in [&stable, &canary] {
        assert!(target.join(RENAMED_ARCHIVE).is_file());
        assert!(!target.join(ORIGINAL_ARCHIVE).exists());
    }
}

#[tokio::test]
async fn flat_layout_rerun_is_idempotent() {
    let sandbox = Sandbox::new();
    let stable = sandbox.flat_target("discord");
    let config = InstallConfig::new().with_target(Channel::Stable, &stable);

    let server = feed_server().await;
    let processes = FakeProcesses::default();
    let notices = RecordingNotices::default();
    let ctx = sandbox.context(Platform::Linux);

    let mut pipeline = InstallPipeline::new(
        &ctx,
        fetcher(&server),
        collaborators(&processes, &accept_all, &notices),
    );
    let first = pipeline.run(&config).await;
    assert!(first.succeeded(), "{:?}", first.failure());
    let entry = std::fs::read_to_string(stable.join("index.js")).unwrap();

    let second = pipeline.run(&config).await;
    assert!(second.succeeded(), "{:?}", second.failure());
    assert!(second.swaps.is_empty());
    assert!(second.package.as_ref().is_some_and(|p| p.unchanged));
    assert!(second.shims.as_ref().is_some_and(|s| s.written.is_empty()));
    assert!(second.provisioned.as_ref().is_some_and(|p| p.created.is_empty()));
    assert_eq!(std::fs::read_to_string(stable.join("index.js")).unwrap(), entry);
    assert_eq!(second.progress, 100.0);
}
