use std::sync::LazyLock;

use regex::Regex;
use reqwest::{Url, header::HeaderMap};
use tracing::{debug, info, instrument, warn};

use crate::{error::FetchError, http::Fetcher};

const MANIFEST_EXTENSION: &str = ".m3u8";

static MANIFEST_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?P<url>https?://[^"'\\\s]+\.m3u8[^"'\\\s]*)"#).unwrap()
});

static PLAYER_SOURCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?i)source\s*:\s*\{\s*src\s*:\s*["'](?P<source>https?://[^"']+)["']"#,
        r#"|file\s*:\s*["'](?P<file>https?://[^"']+)["']"#,
        r#"|hls\s*:\s*["'](?P<hls>https?://[^"']+)["']"#,
    ))
    .unwrap()
});

static IFRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<iframe[^>]+src=["'](?P<src>[^"']+)["']"#).unwrap()
});

/// A way of spotting a manifest URL in page text
pub type Strategy = fn(&str) -> Option<&str>;

/// Tried in order against a document, the first hit wins
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct link", find_manifest_url),
    ("player config", find_player_source),
];

/// First `http(s)://….m3u8` URL appearing anywhere in the text
#[must_use]
pub fn find_manifest_url(text: &str) -> Option<&str> {
    MANIFEST_URL_REGEX
        .captures(text)
        .and_then(|c| c.name("url"))
        .map(|m| m.as_str())
}

/// Player setup objects: `source: { src: "…" }`, `file: "…"` or `hls: "…"`.
///
/// Only the first one in the document is considered, and only if it points at a manifest.
#[must_use]
pub fn find_player_source(text: &str) -> Option<&str> {
    let captures = PLAYER_SOURCE_REGEX.captures(text)?;
    let src = ["source", "file", "hls"]
        .into_iter()
        .find_map(|name| captures.name(name))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())?;

    if src.to_ascii_lowercase().contains(MANIFEST_EXTENSION) {
        Some(src)
    } else {
        debug!("Player source {src} is not a manifest");
        None
    }
}

/// `src` of the first `<iframe>` in the document
#[must_use]
pub fn find_iframe_src(text: &str) -> Option<&str> {
    IFRAME_REGEX
        .captures(text)
        .and_then(|c| c.name("src"))
        .map(|m| m.as_str())
}

/// Runs every [`STRATEGIES`] entry against `text`, resolving the hit against `base`
fn search_document(text: &str, base: &Url) -> Option<Url> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(text)?;
        match base.join(found) {
            Ok(url) => {
                debug!("Found manifest via {name}: {url}");
                Some(url)
            }
            Err(e) => {
                debug!("Ignoring unparsable {name} candidate {found}: {e}");
                None
            }
        }
    })
}

/// Locates the HLS manifest embedded in a channel page.
///
/// Looks at the page itself first, then at most one `<iframe>` inside it.
/// Returns `Ok(None)` when nothing could be found.
///
/// # Errors
/// Errors only when the channel page itself cannot be fetched
#[instrument(skip(fetcher, headers), fields(page = %page_url))]
pub async fn resolve<F: Fetcher>(
    fetcher: &F,
    page_url: &Url,
    headers: &HeaderMap,
) -> Result<Option<Url>, FetchError> {
    let page = fetcher.fetch_text(page_url, headers).await?;

    if let Some(url) = search_document(&page, page_url) {
        return Ok(Some(url));
    }

    let Some(iframe_url) = find_iframe_src(&page).and_then(|src| page_url.join(src).ok()) else {
        debug!("No iframe to descend into");
        return Ok(None);
    };

    info!("Looking into iframe {iframe_url}");
    let nested = match fetcher.fetch_text(&iframe_url, headers).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Unable to load iframe: {e}");
            return Ok(None);
        }
    };

    Ok(search_document(&nested, &iframe_url))
}
