//! Binary entrypoint for the artwork slideshow.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use artwork_slideshow::config::Configuration;
use artwork_slideshow::events::SlideshowEvent;
use artwork_slideshow::manifest::ArtworkManifest;
use artwork_slideshow::render::viewer;
use artwork_slideshow::slideshow;
use clap::{ArgAction, Parser};
use humantime::format_duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "artwork-slideshow",
    version,
    about = "Full-screen artwork slideshow"
)]
struct Args {
    /// Path to YAML config (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Override the manifest path from the config
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,
    /// Print the controller timeline for this long instead of opening a window
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    simulate: Option<Duration>,
    /// Pointer activity offset to inject while simulating (repeatable)
    #[arg(long = "activity-at", value_name = "DURATION", value_parser = humantime::parse_duration)]
    activity_at: Vec<Duration>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    // RUST_LOG wins; otherwise map -v to our level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,artwork_slideshow={level},wgpu=warn,winit=warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        manifest,
        simulate,
        activity_at,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let mut cfg = match config.as_ref() {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(path) = manifest {
        cfg.manifest = path;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::debug!("configuration:\n{:#?}", cfg);

    let artwork = ArtworkManifest::from_json_file(&cfg.manifest, cfg.asset_root.as_deref())
        .with_context(|| format!("failed to load manifest from {}", cfg.manifest.display()))?;
    info!(
        entries = artwork.len().get(),
        manifest = %cfg.manifest.display(),
        asset_root = %artwork.asset_root().display(),
        "loaded artwork manifest"
    );

    if let Some(horizon) = simulate {
        run_simulation(&cfg, &artwork, horizon, &activity_at)?;
        return Ok(());
    }

    let cancel = CancellationToken::new();

    // Ctrl-D/Ctrl-C close the viewer
    if io::stdin().is_terminal() {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut sink = Vec::new();
            match io::stdin().read_to_end(&mut sink) {
                Ok(_) => tracing::info!("stdin closed; initiating shutdown"),
                Err(err) => tracing::warn!("stdin watcher failed: {err}"),
            }
            cancel.cancel();
        });
    } else {
        tracing::debug!("stdin is not a terminal; skipping shutdown watcher");
    }

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    // The event loop owns this thread until the window closes
    let result = viewer::run_windowed(cfg, artwork, cancel.clone()).context("viewer failed");
    cancel.cancel();
    info!("slideshow stopped");
    result
}

fn run_simulation(
    cfg: &Configuration,
    artwork: &ArtworkManifest,
    horizon: Duration,
    activity: &[Duration],
) -> Result<()> {
    let settings = cfg.slideshow_settings();
    let timeline = slideshow::simulate(artwork.len(), settings, horizon, activity)
        .context("failed to simulate slideshow")?;

    println!(
        "# slideshow simulation\n# entries: {}\n# dwell: {}\n# idle-window: {}\n# idle-resume: {:?}\n# horizon: {}\n",
        artwork.len(),
        format_duration(settings.dwell),
        format_duration(settings.idle_window),
        settings.idle_resume,
        format_duration(horizon),
    );

    let label = |index: usize| {
        artwork
            .get(index)
            .map(|entry| entry.description.clone().unwrap_or_else(|| entry.src.clone()))
            .unwrap_or_default()
    };

    println!("{:>12}  show {:>3}  {}", "0s", 0, label(0));
    for entry in timeline {
        let at = format_duration(entry.at).to_string();
        match entry.event {
            SlideshowEvent::Shown { index, .. } => {
                println!("{at:>12}  show {index:>3}  {}", label(index));
            }
            SlideshowEvent::Paused => println!("{at:>12}  paused"),
            SlideshowEvent::Resumed => println!("{at:>12}  resumed"),
        }
    }
    Ok(())
}
