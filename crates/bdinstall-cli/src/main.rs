//! bdinstall - BetterDiscord installer
//!
//! Usage:
//!   bdinstall install           # Patch every detected Discord channel
//!   bdinstall install --channel canary=/path/to/resources
//!   bdinstall detect            # List detected installations
//!   bdinstall paths             # Show where BetterDiscord keeps its data

mod checks;
mod interactive;
mod process;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bdinstall_core::config::{InstallerSettings, SettingsStore};
use bdinstall_core::context::AppContext;
use bdinstall_core::detect::detect_targets;
use bdinstall_core::orchestration::{Collaborators, InstallPipeline, PipelineReport};
use bdinstall_core::progress::ProgressSink;
use bdinstall_core::steps::PackageFetcher;
use bdinstall_core::types::{Channel, InstallConfig};

use crate::checks::TargetSanityCheck;
use crate::interactive::{MigrationAnswer, TerminalNotices};
use crate::process::SystemProcessController;

#[derive(Parser)]
#[command(name = "bdinstall")]
#[command(about = "BetterDiscord installer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install BetterDiscord into Discord
    Install(InstallArgs),

    /// List detected Discord installations
    Detect {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the BetterDiscord data directories
    Paths {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct InstallArgs {
    /// Settings file (defaults to <config dir>/bdinstall/bdinstall.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Install into a specific channel (NAME=PATH, repeatable)
    ///
    /// Overrides both the settings file and detection. When given, only the
    /// listed channels are patched.
    #[arg(long = "channel", value_name = "NAME=PATH")]
    channels: Vec<String>,

    /// Skip all confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,

    /// Never move addons from an old macOS installation
    #[arg(long)]
    no_migrate: bool,

    /// Leave Discord closed after installing
    #[arg(long)]
    no_restart: bool,

    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bdinstall=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Install(args) => run_install(args)?,
        Commands::Detect { format } => run_detect(format)?,
        Commands::Paths { format } => run_paths(format)?,
    }

    Ok(())
}

fn run_install(args: InstallArgs) -> Result<()> {
    let ctx = AppContext::with_defaults()?;
    let store = match &args.config {
        Some(path) => SettingsStore::from_path(path.clone()),
        None => ctx.settings_store(),
    };
    let settings = store.load()?;
    let config = resolve_targets(&ctx, &settings, &args.channels)?;

    let notices = TerminalNotices::new(MigrationAnswer::from_flags(args.yes, args.no_migrate));
    if matches!(args.format, OutputFormat::Table) {
        notices.print_targets(&config);
    }

    let fetcher = PackageFetcher::new(settings.feed.clone())?;
    let processes = SystemProcessController::new(&ctx).with_restart(!args.no_restart);
    let sanity = TargetSanityCheck;
    let collaborators = Collaborators {
        processes: &processes,
        sanity: &sanity,
        notices: &notices,
    };

    let mut pipeline = InstallPipeline::new(&ctx, fetcher, collaborators);
    if matches!(args.format, OutputFormat::Table) {
        pipeline = pipeline.with_progress_sink(progress_printer());
    }

    // Block on the async pipeline using tokio runtime
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let report = runtime.block_on(pipeline.run(&config));

    print_install_result(args.format, &report)?;

    if !report.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

/// Flags win over the settings file, which wins over detection.
fn resolve_targets(
    ctx: &AppContext,
    settings: &InstallerSettings,
    flags: &[String],
) -> Result<InstallConfig> {
    if !flags.is_empty() {
        return flags.iter().map(|flag| parse_channel_flag(flag)).collect();
    }

    let mut config = detect_targets(ctx);
    config.merge(settings.install_config()?);
    Ok(config)
}

fn parse_channel_flag(flag: &str) -> Result<(Channel, PathBuf)> {
    let (name, path) = flag
        .split_once('=')
        .with_context(|| format!("Invalid --channel '{}'. Expected NAME=PATH", flag))?;
    let channel: Channel = name.parse()?;
    if path.trim().is_empty() {
        anyhow::bail!("Missing path for channel '{}'", name);
    }
    Ok((channel, PathBuf::from(path)))
}

fn progress_printer() -> ProgressSink {
    Arc::new(|value| {
        eprintln!("{} {:>3.0}%", style("progress").dim(), value);
    })
}

fn print_install_result(format: OutputFormat, report: &PipelineReport) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if let Some(failure) = report.failure() {
                println!("✗ Installation failed: {}", failure.message());
            } else {
                println!("✓ BetterDiscord installed");
                if let Some(package) = &report.package {
                    let tag = package.asset.tag.as_deref().unwrap_or("unknown");
                    println!("  Package {} ({})", tag, package.path.display());
                }
                if let Some(migration) = &report.migration {
                    println!("  Moved {} addon(s) from the old folder", migration.moved.len());
                    for failed in &migration.failed {
                        println!("  ⚠ Could not move {}", failed.display());
                    }
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "succeeded": report.succeeded(),
                "failed_step": report.failure().map(|f| f.step),
                "error": report.failure().map(|f| f.message()),
                "notices": report.notices,
                "completed": report.completed_steps(),
                "package": report.package.as_ref().map(|p| serde_json::json!({
                    "path": p.path,
                    "tag": p.asset.tag,
                    "digest": p.digest,
                    "unchanged": p.unchanged,
                })),
                "progress": report.progress,
                "started_at": report.started_at.to_rfc3339(),
                "finished_at": report.finished_at.to_rfc3339(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn run_detect(format: OutputFormat) -> Result<()> {
    let ctx = AppContext::with_defaults()?;
    let config = detect_targets(&ctx);

    match format {
        OutputFormat::Table => {
            if config.is_empty() {
                println!("No Discord installation found.");
                return Ok(());
            }
            println!("{:<16} {:<8} PATH", "CHANNEL", "ID");
            println!("{}", "-".repeat(60));
            for target in config.targets() {
                println!(
                    "{:<16} {:<8} {}",
                    target.channel.display_name(),
                    target.channel.as_str(),
                    target.path.display()
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config.targets())?);
        }
    }

    Ok(())
}

fn run_paths(format: OutputFormat) -> Result<()> {
    let ctx = AppContext::with_defaults()?;
    let layout = ctx.data_layout();

    match format {
        OutputFormat::Table => {
            println!("Platform: {}", ctx.platform());
            println!("Settings: {}", ctx.settings_store().config_path().display());
            println!("Root:     {}", layout.root().display());
            println!("Package:  {}", layout.package_path().display());
            println!("Plugins:  {}", layout.plugins_dir().display());
            println!("Themes:   {}", layout.themes_dir().display());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "platform": ctx.platform(),
                "settings": ctx.settings_store().config_path(),
                "root": layout.root(),
                "package": layout.package_path(),
                "plugins": layout.plugins_dir(),
                "themes": layout.themes_dir(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
