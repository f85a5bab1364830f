mod daemon;

use clap::Parser;
use daemon::config::{CliOverrides, Config, FileConfig};
use daemon::notifier::DesktopNotifier;
use daemon::watcher::start_watching;
use log::info;
use std::error::Error;
use std::path::PathBuf;

/// Polls a directory tree for VCS checkouts and notifies about incoming changesets.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Directory to scan (defaults to the current directory)
    root: Option<PathBuf>,
    /// Path to an optional config TOML
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Scan interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,
    /// Run a single scan and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let file = match &args.config {
        Some(path) => FileConfig::load_config(path)?,
        None => FileConfig::default(),
    };
    let config = Config::from_env(
        file,
        CliOverrides {
            root: args.root,
            interval: args.interval,
            once: args.once,
        },
    )?;

    info!("Watching {}", config.root.display());
    start_watching(&config, &DesktopNotifier::new()).await?;
    Ok(())
}
