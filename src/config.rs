use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub output: OutputConfig,
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Root of every generated playlist
    pub folder: PathBuf,
    pub best_folder: PathBuf,
    pub master_folder: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Output file name, without extension
    pub slug: String,
    /// Page the manifest is embedded in
    pub url: String,
    /// Extra request headers, typically `Referer`
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Loads the JSON configuration document
///
/// # Errors
/// Errors when the file cannot be read or is not a valid configuration
#[instrument]
pub async fn load_config(path: &Path) -> Result<Config> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Reading config file {}", path.display()))?;

    let config = serde_json::from_str::<Config>(&raw)
        .with_context(|| format!("Parsing config file {}", path.display()))?;
    debug!("Loaded {} channels", config.channels.len());

    Ok(config)
}

/// Directories the two playlists of every channel are written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub root: PathBuf,
    pub best_dir: PathBuf,
    pub master_dir: PathBuf,
}

impl OutputPaths {
    #[must_use]
    pub fn new(base: &Path, output: &OutputConfig) -> Self {
        let root = base.join(&output.folder);
        Self {
            best_dir: root.join(&output.best_folder),
            master_dir: root.join(&output.master_folder),
            root,
        }
    }

    /// Creates both output directories
    ///
    /// # Errors
    /// Errors when a directory cannot be created
    pub async fn ensure(&self) -> Result<()> {
        for dir in [&self.best_dir, &self.master_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Creating output directory {}", dir.display()))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn master_file(&self, slug: &str) -> PathBuf {
        self.master_dir.join(format!("{slug}.m3u8"))
    }

    #[must_use]
    pub fn best_file(&self, slug: &str) -> PathBuf {
        self.best_dir.join(format!("{slug}.m3u8"))
    }
}
