#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bdinstall_core::context::AppContext;
use bdinstall_core::orchestration::{Notices, ProcessController};
use bdinstall_core::progress::{ProgressSink, StepProgress};
use bdinstall_core::steps::archive::ORIGINAL_ARCHIVE;
use bdinstall_core::types::{Channel, Platform};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PACKAGE_BYTES: &[u8] = b"betterdiscord package v1";

/// Isolated home, app data and Discord installs under one temp dir.
pub struct Sandbox {
    pub temp: TempDir,
    pub home: PathBuf,
    pub app_data: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let home = temp.path().join("home");
        let app_data = temp.path().join("appdata");
        std::fs::create_dir_all(&home).expect("Failed to create home dir");
        std::fs::create_dir_all(&app_data).expect("Failed to create app data dir");
        Self {
            temp,
            home,
            app_data,
        }
    }

    pub fn context(&self, platform: Platform) -> AppContext {
        AppContext::new(platform, self.home.clone(), self.app_data.clone())
    }

    /// `<name>/resources` containing an `app.asar`.
    pub fn nested_target(&self, name: &str) -> PathBuf {
        let resources = self.temp.path().join(name).join("resources");
        std::fs::create_dir_all(&resources).expect("Failed to create resources dir");
        std::fs::write(resources.join(ORIGINAL_ARCHIVE), b"original asar")
            .expect("Failed to write app.asar");
        resources
    }

    /// `<name>/discord_desktop_core` containing a `core.asar`.
    pub fn flat_target(&self, name: &str) -> PathBuf {
        let core = self.temp.path().join(name).join("discord_desktop_core");
        std::fs::create_dir_all(&core).expect("Failed to create core dir");
        std::fs::write(core.join("core.asar"), b"core").expect("Failed to write core.asar");
        std::fs::write(core.join("index.js"), b"module.exports = require('./core.asar');")
            .expect("Failed to write index.js");
        core
    }

    pub fn legacy_root(&self) -> PathBuf {
        self.home.join("Library").join("Preferences").join("betterdiscord")
    }
}

/// Process controller that records calls and fails on request.
#[derive(Default)]
pub struct FakeProcesses {
    pub fail_stop: bool,
    pub fail_start: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeProcesses {
    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessController for FakeProcesses {
    fn stop(&self, channels: &[Channel], progress: &mut StepProgress<'_>) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("stop".to_string());
        if self.fail_stop {
            anyhow::bail!("access denied");
        }
        for _ in channels {
            progress.tick();
        }
        Ok(())
    }

    fn start(&self, channels: &[Channel], progress: &mut StepProgress<'_>) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("start".to_string());
        if self.fail_start {
            anyhow::bail!("executable not found");
        }
        for _ in channels {
            progress.tick();
        }
        Ok(())
    }
}

/// Notices that count what was shown and answer the migration prompt.
#[derive(Default)]
pub struct RecordingNotices {
    pub accept_migration: bool,
    pub kills: AtomicUsize,
    pub restarts: AtomicUsize,
    pub prompts: Mutex<Vec<PathBuf>>,
}

impl RecordingNotices {
    pub fn accepting() -> Self {
        Self {
            accept_migration: true,
            ..Self::default()
        }
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<PathBuf> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Notices for RecordingNotices {
    fn kill_notice(&self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
    }

    fn restart_notice(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn confirm_legacy_migration(&self, legacy_root: &Path) -> bool {
        self.prompts.lock().unwrap().push(legacy_root.to_path_buf());
        self.accept_migration
    }
}

/// Progress sink that keeps every value it receives.
pub fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink: ProgressSink = Arc::new(move |value| sink_seen.lock().unwrap().push(value));
    (sink, seen)
}

/// Release feed at `/releases` whose latest release carries the package at
/// `/assets/1`.
pub async fn mount_feed(server: &MockServer, body: &[u8]) {
    let releases = json!([
        {
            "tag_name": "v1.9.3",
            "assets": [
                {"name": "installer.exe", "url": format!("{}/assets/0", server.uri())},
                {"name": "betterdiscord.asar", "url": format!("{}/assets/1", server.uri())}
            ]
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(releases))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/assets/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

pub fn feed_url(server: &MockServer) -> String {
    format!("{}/releases", server.uri())
}
