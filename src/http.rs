use std::{collections::BTreeMap, time::Duration};

use reqwest::{
    Url,
    header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT},
};
use tracing::{debug, instrument};

use crate::error::FetchError;

/// Most channel pages refuse anything that does not look like a browser
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Retrieves the text body of a URL.
///
/// `headers` are the per-channel extra headers, they are sent with this request only.
pub trait Fetcher {
    fn fetch_text(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> impl Future<Output = Result<String, FetchError>>;
}

/// [`Fetcher`] backed by a shared [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch_text(&self, url: &Url, headers: &HeaderMap) -> Result<String, FetchError> {
        let res = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }

        let body = res.text().await.map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;
        debug!("Fetched {} bytes", body.len());

        Ok(body)
    }
}

/// Builds the client shared by every channel of a run.
///
/// Only the defaults live here; channel headers are passed per request so they never leak
/// from one channel into the next.
///
/// # Errors
/// Errors when the TLS backend cannot be initialized
pub fn init_http_client() -> reqwest::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
}

/// Converts a channel's configured headers into a [`HeaderMap`]
///
/// # Errors
/// Errors on the first name or value that is not a valid HTTP header
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let invalid = || FetchError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(header_name, header_value);
    }

    Ok(map)
}
