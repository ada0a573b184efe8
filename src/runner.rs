use std::{fmt, io::ErrorKind, path::Path};

use reqwest::Url;
use tracing::{error, info, instrument, warn};

use crate::{
    config::{ChannelConfig, OutputPaths},
    error::ChannelError,
    extract::extract_variants,
    http::{Fetcher, header_map},
    playlist::{PlaylistPair, synthesize},
    resolver::resolve,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Success,
    FetchError,
    NoManifestFound,
    ExtractionFailed,
    NoPlaylistProduced,
    WriteFailed,
}

impl ChannelOutcome {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<&ChannelError> for ChannelOutcome {
    fn from(err: &ChannelError) -> Self {
        match err {
            ChannelError::InvalidChannelUrl { .. } | ChannelError::Fetch(_) => Self::FetchError,
            ChannelError::NotFound { .. } => Self::NoManifestFound,
            ChannelError::Extraction { .. } => Self::ExtractionFailed,
            ChannelError::EmptyPlaylist { .. } => Self::NoPlaylistProduced,
            ChannelError::Write { .. } => Self::WriteFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelResult {
    pub slug: String,
    pub outcome: ChannelOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub results: Vec<ChannelResult>,
}

impl RunSummary {
    #[must_use]
    pub fn success(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.success()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// No channel made it, the run as a whole failed
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.success() == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Success: {}, Failed: {}, Total: {}",
            self.success(),
            self.failed(),
            self.total()
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Remove a failed channel's playlists from the previous run
    pub prune_stale: bool,
}

/// Processes every channel one after the other.
///
/// A failing channel never stops the run; its failure is recorded in the summary.
pub async fn run<F: Fetcher>(
    fetcher: &F,
    channels: &[ChannelConfig],
    paths: &OutputPaths,
    options: RunOptions,
) -> RunSummary {
    let mut summary = RunSummary::default();

    for channel in channels {
        info!("Processing {} ({})", channel.slug, channel.url);

        let outcome = match process_channel(fetcher, channel, paths).await {
            Ok(()) => {
                info!("Published {}", channel.slug);
                ChannelOutcome::Success
            }
            Err(e) => {
                let outcome = ChannelOutcome::from(&e);
                match outcome {
                    ChannelOutcome::NoManifestFound | ChannelOutcome::NoPlaylistProduced => {
                        warn!("{}: {e}", channel.slug);
                    }
                    _ => error!("{}: {:#}", channel.slug, anyhow::Error::new(e)),
                }

                if options.prune_stale {
                    prune(paths, &channel.slug).await;
                }
                outcome
            }
        };

        summary.results.push(ChannelResult {
            slug: channel.slug.clone(),
            outcome,
        });
    }

    let failed = summary
        .results
        .iter()
        .filter(|r| !r.outcome.is_success())
        .map(|r| format!("{} ({:?})", r.slug, r.outcome))
        .collect::<Vec<String>>();
    if !failed.is_empty() {
        warn!("Failed channels: {}", failed.join(", "));
    }

    info!("{summary}");
    summary
}

/// Page → manifest URL → variants → playlists → files
#[instrument(skip_all, fields(slug = %channel.slug))]
async fn process_channel<F: Fetcher>(
    fetcher: &F,
    channel: &ChannelConfig,
    paths: &OutputPaths,
) -> Result<(), ChannelError> {
    let page_url = Url::parse(&channel.url).map_err(|e| ChannelError::InvalidChannelUrl {
        url: channel.url.clone(),
        reason: e.to_string(),
    })?;
    let headers = header_map(&channel.headers)?;

    let Some(manifest_url) = resolve(fetcher, &page_url, &headers).await? else {
        return Err(ChannelError::NotFound { page: page_url });
    };
    info!("Manifest: {manifest_url}");

    let variants = extract_variants(fetcher, &manifest_url, &headers).await?;
    let Some(playlists) = synthesize(&variants) else {
        return Err(ChannelError::EmptyPlaylist { url: manifest_url });
    };

    write_playlists(paths, &channel.slug, &playlists).await
}

async fn write_playlists(
    paths: &OutputPaths,
    slug: &str,
    playlists: &PlaylistPair,
) -> Result<(), ChannelError> {
    write_file(&paths.master_file(slug), &playlists.master).await?;
    write_file(&paths.best_file(slug), &playlists.best).await
}

async fn write_file(path: &Path, contents: &str) -> Result<(), ChannelError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| ChannelError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Best effort, a leftover file is only logged
async fn prune(paths: &OutputPaths, slug: &str) {
    for path in [paths.master_file(slug), paths.best_file(slug)] {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("Removed stale {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Unable to remove stale {}: {e}", path.display()),
        }
    }
}
