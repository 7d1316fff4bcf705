use std::path::PathBuf;

use aesimp_tools::dispatch::{self, Dispatcher};
use aesimp_tools::paths::{self, AppPaths};
use aesimp_tools::prompt::{AutoPrompt, ConsolePrompt, Prompt};
use aesimp_tools::toolkit::Toolkit;
use anyhow::{Context, Result};
use clap::Parser;

/// Media helpers for the file manager's "Send to" menu.
///
/// Without a mode the program installs itself and its launchers.
#[derive(Parser, Debug)]
#[command(name = "aesimp", version)]
struct Cli {
    /// Folder holding the tool cache, downloaded tools and settings
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Answer every question with its default and allow tool installs
    #[arg(short = 'y', long)]
    yes: bool,

    /// Do not wait for Enter after an error
    #[arg(long)]
    no_pause: bool,

    /// install, uninstall, clear-cache, converter, upscale, interpolate,
    /// remux, decompose, ripAudio, compress or downscale
    mode: Option<String>,

    /// Files or folders handed over by the file manager
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "aesimp_tools=debug,aesimp=debug".to_string()
        } else {
            "aesimp_tools=warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let kit = match open_toolkit(&cli) {
        Ok(kit) => kit,
        Err(e) => {
            let prompt = prompt_for(&cli);
            let outcome = dispatch::report_failure(prompt.as_ref(), !cli.no_pause, &format!("{e:#}"));
            std::process::exit(outcome.exit_code());
        }
    };

    let outcome =
        Dispatcher::new(&kit, !cli.no_pause).dispatch(cli.mode.as_deref(), &cli.files);
    tracing::debug!(outcome = ?outcome, "done");

    let code = outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
}

fn prompt_for(cli: &Cli) -> Box<dyn Prompt> {
    if cli.yes {
        Box::new(AutoPrompt { assume_yes: true })
    } else {
        Box::new(ConsolePrompt)
    }
}

fn open_toolkit(cli: &Cli) -> Result<Toolkit> {
    let base_dir = cli
        .base_dir
        .as_deref()
        .map(AppPaths::normalize_base_dir)
        .or_else(paths::default_base_dir)
        .context("no base directory; pass --base-dir or set AESIMP_BASE_DIR")?;
    Toolkit::open(AppPaths::new(base_dir.clone()), prompt_for(cli), true)
        .with_context(|| format!("failed to open {}", base_dir.display()))
}
