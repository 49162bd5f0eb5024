//! SiteMirror - single-page web mirroring library
//!
//! Fetches one HTML page, downloads the stylesheets, scripts, images and
//! videos it references, and writes a self-contained copy:
//!
//! ```text
//! <output root>/
//!   index.html   page with successfully mirrored references rewritten
//!   css/ js/ images/ videos/
//! ```
//!
//! Asset downloads run concurrently under a configurable ceiling. A failed
//! asset never fails the job: its reference keeps the original URL and is
//! listed in [`MirrorResult::failed`]. Only a failed root fetch (or an
//! unwritable output tree) is fatal.
//!
//! ## Fetcher System
//!
//! Downloads go through the [`Fetcher`] trait. [`HttpFetcher`] is the
//! built-in implementation; tests and embedders can plug their own in via
//! [`MirrorBuilder::fetcher`].
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> Result<(), sitemirror::MirrorError> {
//! let result = sitemirror::Mirror::builder()
//!     .max_concurrency(8)
//!     .build()
//!     .map_err(sitemirror::MirrorError::Client)?
//!     .run("https://example.com/", "output")
//!     .await?;
//!
//! for failed in &result.failed {
//!     eprintln!("{}: {}", failed.reference.resolved_url, failed.reason);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod document;
mod error;
pub mod extract;
pub mod fetchers;
pub mod format;
mod mirror;
pub mod resolve;
mod rewrite;
mod types;
pub mod writer;

pub use client::{mirror, mirror_with_options, MirrorOptions};
pub use error::{FetchError, MirrorError, ResourceError};
pub use fetchers::{Fetcher, HttpFetcher};
pub use format::{format_css, format_js, FormatError};
pub use mirror::{Mirror, MirrorBuilder};
pub use types::{
    CollisionPolicy, FailedReference, FetchMode, Fetched, JobStatus, MirrorJob, MirrorProgress,
    MirrorResult, ResourceKind, ResourceReference,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Everruns SiteMirror/1.0";
