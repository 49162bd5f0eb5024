//! Entry points for SiteMirror
//!
//! This module provides the main entry points for mirroring a page.
//! The job itself is driven by [`Mirror`](crate::Mirror).

use crate::error::MirrorError;
use crate::mirror::Mirror;
use crate::types::{CollisionPolicy, MirrorResult};
use std::path::Path;
use std::time::Duration;

/// Default output root
pub const DEFAULT_OUTPUT_ROOT: &str = "output";

/// Default ceiling on concurrently running asset tasks
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Mirror options that can be configured via the builder
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// Maximum asset tasks in flight; 0 means one slot per reference
    pub max_concurrency: usize,
    /// Per-request timeout; none by default
    pub request_timeout: Option<Duration>,
    /// Handling of colliding destination names
    pub collision_policy: CollisionPolicy,
    /// Pretty-print stylesheets and scripts
    pub format_assets: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout: None,
            collision_policy: CollisionPolicy::default(),
            format_assets: true,
        }
    }
}

/// Mirror a page into [`DEFAULT_OUTPUT_ROOT`]
///
/// Uses default options. For custom options, use [`mirror_with_options`]
/// or [`Mirror::builder`].
pub async fn mirror(url: &str) -> Result<MirrorResult, MirrorError> {
    mirror_with_options(url, DEFAULT_OUTPUT_ROOT, MirrorOptions::default()).await
}

/// Mirror a page into `output_root` with custom options
pub async fn mirror_with_options(
    url: &str,
    output_root: impl AsRef<Path>,
    options: MirrorOptions,
) -> Result<MirrorResult, MirrorError> {
    let engine = Mirror::with_options(options).map_err(MirrorError::Client)?;
    engine.run(url, output_root).await
}
