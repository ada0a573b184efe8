use std::path::PathBuf;

use reqwest::{StatusCode, Url};
use thiserror::Error;

/// A page or manifest could not be retrieved
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: Url, status: StatusCode },

    #[error("invalid request header `{name}`")]
    InvalidHeader { name: String },
}

/// Everything that can go wrong while processing a single channel.
///
/// None of these abort the run, they are turned into a [`crate::runner::ChannelOutcome`]
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel URL `{url}` is invalid: {reason}")]
    InvalidChannelUrl { url: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no manifest URL found on {page}")]
    NotFound { page: Url },

    #[error("could not extract variants from {url}: {reason}")]
    Extraction { url: Url, reason: String },

    #[error("manifest {url} has no renderable video variants")]
    EmptyPlaylist { url: Url },

    #[error("could not write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
