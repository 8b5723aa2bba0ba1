mod acquire;
mod build;
mod catalog;
mod cleanup;
mod common;
mod config;
mod errors;
mod picker;
mod planner;
mod self_update;
mod ui;
mod version;

use anyhow::{Result, bail};
use clap::{CommandFactory, Parser};
use comfy_table::{Table, presets::UTF8_FULL};

use crate::common::paths::Roots;
use crate::planner::{AppStatus, RunContext, RunReport, RunRequest};
use crate::ui::prelude::*;

/// Keep a Raspberry Pi's amateur radio applications current
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Comma-separated application ids; omit to choose interactively
    apps: Option<String>,

    /// Reinstall even when the installed version looks current
    #[arg(short, long)]
    force: bool,

    /// Sync shackup's own distribution repository before processing
    #[arg(long)]
    self_check: bool,

    /// Print the application catalog and exit
    #[arg(short, long)]
    list: bool,

    /// Emit structured JSON events instead of text
    #[arg(long)]
    json: bool,

    /// Activate debug output
    #[arg(short, long)]
    debug: bool,

    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", value_enum)]
    completions: Option<clap_complete::Shell>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(
        if cli.json {
            ui::OutputFormat::Json
        } else {
            ui::OutputFormat::Text
        },
        true,
    );
    ui::set_debug_mode(cli.debug);

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    install_signal_handler();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            emit(Level::Error, "fatal", &format!("{e:#}"), None);
            1
        }
    };
    cleanup::run_all();
    std::process::exit(code);
}

/// One handler, installed once, covering interrupt and termination. The
/// same cleanup registry also runs on the normal exit path, so every way
/// out of the process restores swap and removes scratch workspaces.
fn install_signal_handler() {
    tokio::spawn(async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
        emit(Level::Warn, "interrupt", "interrupted; cleaning up...", None);
        cleanup::run_all();
        std::process::exit(130);
    });
}

async fn run(cli: Cli) -> Result<i32> {
    // Individual commands elevate themselves with sudo; running the whole
    // tool as root scatters root-owned files through the user's home.
    // Image-build automation that genuinely runs as root can override.
    if matches!(sudo::check(), sudo::RunningAs::Root)
        && std::env::var_os("SHACKUP_ALLOW_ROOT").is_none()
    {
        bail!(
            "do not run shackup as root; it elevates individual commands itself \
             (set SHACKUP_ALLOW_ROOT=1 to override)"
        );
    }

    let config = config::Config::load()?;
    let roots = Roots::resolve(&config)?;

    if cli.list {
        print_catalog(&roots);
        return Ok(0);
    }

    let ids: Vec<String> = match &cli.apps {
        Some(csv) => csv.split(',').map(str::to_string).collect(),
        None => picker::pick(catalog::CATALOG)?,
    };

    let request = RunRequest::new(ids, cli.force, cli.self_check);
    if request.apps.is_empty() && !request.self_check {
        bail!("no applications requested");
    }

    let mut ctx = RunContext::new(roots, request.force, config.swap_ceiling_mb);
    let report = planner::run(catalog::CATALOG, &request, &mut ctx).await;

    summarize(&report);
    Ok(if report.success() { 0 } else { 1 })
}

fn summarize(report: &RunReport) {
    if report.self_updated || report.outcomes.is_empty() {
        return;
    }
    emit(Level::Info, "summary", "", None);
    for outcome in &report.outcomes {
        let level = match outcome.status {
            AppStatus::Failed => Level::Error,
            AppStatus::Skipped => Level::Warn,
            _ => Level::Success,
        };
        emit(
            level,
            "summary.app",
            &format!("  {:<10} {:<10} {}", outcome.id, outcome.status.label(), outcome.message),
            Some(serde_json::json!({
                "app": outcome.id,
                "status": outcome.status.label(),
            })),
        );
    }
}

fn print_catalog(roots: &Roots) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["application", "check", "installed", "description"]);
    for spec in catalog::CATALOG {
        table.add_row([
            spec.id,
            spec.strategy.label(),
            if spec.installed_locally(&roots.source) {
                "yes"
            } else {
                ""
            },
            spec.description,
        ]);
    }
    println!("{table}");
}
