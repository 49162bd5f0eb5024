//! Fetcher system for page and asset retrieval
//!
//! Design: the orchestrator only talks to the [`Fetcher`] trait, so the
//! network layer can be swapped (e.g. for a canned fetcher in tests).

mod http;

pub use http::HttpFetcher;

use crate::error::FetchError;
use crate::types::{FetchMode, Fetched};
use async_trait::async_trait;

/// Trait for retrieving a URL
///
/// Implementations perform exactly one attempt; retries are not part of
/// the contract.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Unique identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Fetch `url`, decoding the body according to `mode`
    ///
    /// Fails on transport errors and on non-success status codes.
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<Fetched, FetchError>;
}

/// Check that a URL uses a scheme the fetchers can retrieve
pub(crate) fn validate_scheme(url: &str) -> Result<url::Url, FetchError> {
    let invalid = || FetchError::InvalidUrlScheme {
        url: url.to_string(),
    };

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(invalid());
    }

    url::Url::parse(url).map_err(|_| invalid())
}
