#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use config::{OutputPaths, load_config};
use http::{HttpFetcher, init_http_client};
use runner::{RunOptions, RunSummary, run};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod playlist;
pub mod resolver;
pub mod runner;
pub mod variant;

/// Finds the live HLS manifest of every configured channel page and republishes it
/// as a master playlist and a best quality playlist
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file listing the output folders and channels
    #[arg(env = "HLS_REPUBLISH_CONFIG", default_value = "config/config.json")]
    config: PathBuf,

    /// Directory the configured output folder is relative to (defaults to the current directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Delete a channel's previously published playlists when it fails
    #[arg(long)]
    prune_stale: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();

    let args = Args::parse();

    match try_main(args).await {
        Ok(summary) if summary.is_total_failure() => {
            error!("No channel could be published");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main(args: Args) -> Result<RunSummary> {
    let config = load_config(&args.config).await?;

    let paths = OutputPaths::new(&args.base_dir.unwrap_or_default(), &config.output);
    paths.ensure().await?;
    info!(
        "Publishing {} channels into {}",
        config.channels.len(),
        paths.root.display()
    );

    let client = init_http_client().context("Building HTTP client")?;
    let fetcher = HttpFetcher::new(client);

    let options = RunOptions {
        prune_stale: args.prune_stale,
    };
    Ok(run(&fetcher, &config.channels, &paths, options).await)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
