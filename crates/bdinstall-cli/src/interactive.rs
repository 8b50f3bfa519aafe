//! Terminal notices and prompts shown while the pipeline runs.
//!
//! Uses dialoguer for the migration prompt and console for styling.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;

use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use tracing::warn;

use bdinstall_core::orchestration::Notices;
use bdinstall_core::types::InstallConfig;

/// How the legacy migration question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationAnswer {
    /// Ask on the terminal.
    Prompt,
    /// `--yes`: migrate without asking.
    Always,
    /// `--no-migrate`: leave old addons alone.
    Never,
}

impl MigrationAnswer {
    pub fn from_flags(yes: bool, no_migrate: bool) -> Self {
        if no_migrate {
            MigrationAnswer::Never
        } else if yes {
            MigrationAnswer::Always
        } else {
            MigrationAnswer::Prompt
        }
    }
}

pub struct TerminalNotices<W: Write = io::Stderr> {
    migration: MigrationAnswer,
    /// Output writer (for testing)
    writer: RefCell<W>,
    theme: ColorfulTheme,
}

impl TerminalNotices<io::Stderr> {
    pub fn new(migration: MigrationAnswer) -> Self {
        Self {
            migration,
            writer: RefCell::new(io::stderr()),
            theme: ColorfulTheme::default(),
        }
    }
}

impl<W: Write> TerminalNotices<W> {
    /// Create notices with a custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(migration: MigrationAnswer, writer: W) -> Self {
        Self {
            migration,
            writer: RefCell::new(writer),
            theme: ColorfulTheme::default(),
        }
    }

    #[cfg(test)]
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    fn print(&self, text: impl std::fmt::Display) {
        // Output errors are ignored.
        let _ = writeln!(self.writer.borrow_mut(), "{}", text);
    }

    /// Print the channels about to be patched.
    pub fn print_targets(&self, config: &InstallConfig) {
        self.print("");
        self.print(style("  BetterDiscord Installer").bold().cyan());
        self.print("");
        for target in config.targets() {
            self.print(format!(
                "  {:<16} {}",
                target.channel.display_name(),
                style(target.path.display()).green()
            ));
        }
        self.print("");
    }
}

impl<W: Write> Notices for TerminalNotices<W> {
    fn kill_notice(&self) {
        self.print(format!(
            "{} Could not close Discord. Close it manually (including the tray icon) and run the installer again.",
            style("✗").red().bold()
        ));
    }

    fn restart_notice(&self) {
        self.print(format!(
            "{} BetterDiscord was installed, but Discord could not be restarted. Start it manually.",
            style("⚠").yellow().bold()
        ));
    }

    fn confirm_legacy_migration(&self, legacy_root: &Path) -> bool {
        match self.migration {
            MigrationAnswer::Always => true,
            MigrationAnswer::Never => false,
            MigrationAnswer::Prompt => {
                self.print(format!(
                    "  Found an old BetterDiscord folder at {}",
                    style(legacy_root.display()).yellow()
                ));
                Confirm::with_theme(&self.theme)
                    .with_prompt("Move your plugins and themes to the new location?")
                    .default(true)
                    .interact()
                    .unwrap_or_else(|err| {
                        warn!(error = %err, "Could not prompt for migration, skipping it");
                        false
                    })
            }
        }
    }
}
