//! Error types for SiteMirror

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while retrieving a single URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL has invalid scheme or cannot be parsed
    #[error("Invalid URL {url}: must start with http:// or https://")]
    InvalidUrlScheme { url: String },

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request did not complete within the configured timeout
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Failed to connect to server
    #[error("Failed to connect to {url}")]
    ConnectError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Other request error
    #[error("Request to {url} failed: {message}")]
    RequestError { url: String, message: String },
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if err.is_connect() {
            FetchError::ConnectError { url, source: err }
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus {
                url,
                status: status.as_u16(),
            }
        } else {
            FetchError::RequestError {
                url,
                message: err.to_string(),
            }
        }
    }

    /// The URL the failed request targeted, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::InvalidUrlScheme { url }
            | FetchError::Timeout { url }
            | FetchError::ConnectError { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::RequestError { url, .. } => Some(url),
            FetchError::ClientBuildError(_) => None,
        }
    }
}

/// Non-fatal failure of one resource task
///
/// Recorded against the reference in [`MirrorResult::failed`](crate::MirrorResult);
/// sibling tasks are unaffected.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The asset could not be retrieved
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The asset was retrieved but could not be persisted
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal failure of a mirror job
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Source URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// The entry page could not be retrieved; nothing was written
    #[error("Failed to fetch root page: {0}")]
    RootFetch(#[source] FetchError),

    /// The fetcher could not be set up; nothing was fetched
    #[error("Failed to set up fetcher: {0}")]
    Client(#[source] FetchError),

    /// The output tree could not be prepared or finalized
    #[error("Failed to write output at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
