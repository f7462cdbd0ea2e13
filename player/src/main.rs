mod buffer;
mod catalog;
mod cli;
mod config;
mod decoder;
mod kiosk;
mod macros;
mod playback;
mod presenter;
mod selector;
mod stats;
mod surface;
mod video;
mod wayland;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cli::Cli;
use crate::config::{Config, Options};
use crate::kiosk::{Kiosk, RunOutcome};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();
    log::set_max_level(cli.log_level().unwrap_or(log::LevelFilter::Info));

    log::debug!("Starting Videokê v{}", env!("CARGO_PKG_VERSION"));

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(config::default_data_dir);
    let candidates = Config::candidate_paths(cli.config.as_deref(), &data_dir);
    let (config, config_path) = Config::load_first(&candidates)?;

    let options = Options::resolve(&cli, &config, config_path);
    log::set_max_level(options.log_level);

    match &options.config_path {
        Some(path) => log::info!("Loaded config from {}", path.display()),
        None => log::debug!("No config file found in {:?}, using defaults", candidates),
    }
    log::debug!("Options: {:?}", options);

    let interrupted = Arc::new(AtomicBool::new(false));
    watch_signals(Arc::clone(&interrupted))?;

    // The kiosk loop is synchronous and owns the Wayland connection
    let outcome = tokio::task::spawn_blocking(move || run_kiosk(&options, &interrupted))
        .await
        .context("Kiosk thread panicked")??;

    match outcome {
        RunOutcome::Quit => Ok(ExitCode::SUCCESS),
        RunOutcome::Interrupted => {
            log::info!("Aborting");
            Ok(ExitCode::from(1))
        }
    }
}

fn run_kiosk(options: &Options, interrupted: &AtomicBool) -> Result<RunOutcome> {
    let mut window = wayland::connect(options)?;
    let opener = video::GstOpener::new()?;
    let mut kiosk = Kiosk::from_options(options, opener);

    kiosk::run(&mut window, &mut kiosk, options.fps, interrupted)
}

/// Set `flag` on the first SIGINT or SIGTERM
fn watch_signals(flag: Arc<AtomicBool>) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                log::debug!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                log::debug!("Received SIGINT");
            }
        }

        flag.store(true, Ordering::Relaxed);
    });

    Ok(())
}
