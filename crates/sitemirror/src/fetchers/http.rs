//! HTTP fetcher
//!
//! Handles http:// and https:// URLs with a single shared reqwest client.

use crate::client::MirrorOptions;
use crate::error::FetchError;
use crate::fetchers::{validate_scheme, Fetcher};
use crate::types::{FetchMode, Fetched};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use tracing::debug;

/// Accept header for stylesheets, scripts and the root page
const TEXT_ACCEPT: &str = "text/html, text/css, application/javascript, text/plain, */*;q=0.8";

/// Plain HTTP(S) GET fetcher
///
/// - One attempt per URL, no retries
/// - Non-success status codes are errors
/// - Text bodies are decoded using the response charset
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from mirror options
    pub fn new(options: &MirrorOptions) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = options.request_timeout {
            builder = builder.connect_timeout(timeout).timeout(timeout);
        }

        let client = builder.build().map_err(FetchError::ClientBuildError)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<Fetched, FetchError> {
        let parsed = validate_scheme(url)?;

        let accept = match mode {
            FetchMode::Text => TEXT_ACCEPT,
            FetchMode::Binary => "*/*",
        };

        let response = self
            .client
            .get(parsed)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let fetched = match mode {
            FetchMode::Text => Fetched::Text(
                response
                    .text()
                    .await
                    .map_err(|e| FetchError::from_reqwest(url, e))?,
            ),
            FetchMode::Binary => Fetched::Binary(
                response
                    .bytes()
                    .await
                    .map_err(|e| FetchError::from_reqwest(url, e))?,
            ),
        };

        debug!(url = %url, status = status.as_u16(), ?mode, "Fetched");
        Ok(fetched)
    }
}
