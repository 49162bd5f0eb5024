//! Core types for SiteMirror

use crate::error::ResourceError;
use ego_tree::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Category of a page asset
///
/// The kind decides the destination subdirectory, the fallback file name,
/// the attribute that gets rewritten and how the body is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// `<link rel="stylesheet" href>`
    Stylesheet,
    /// `<script src>`
    Script,
    /// `<img src>`
    Image,
    /// `<video src>` and `<video><source src>`
    Video,
}

impl ResourceKind {
    /// All kinds, in the order their subdirectories are laid out
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Stylesheet,
        ResourceKind::Script,
        ResourceKind::Image,
        ResourceKind::Video,
    ];

    /// Subdirectory of the output root holding assets of this kind
    pub fn dir(self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "css",
            ResourceKind::Script => "js",
            ResourceKind::Image => "images",
            ResourceKind::Video => "videos",
        }
    }

    /// File name used when the URL has no usable last path segment
    pub fn default_file_name(self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "style.css",
            ResourceKind::Script => "script.js",
            ResourceKind::Image => "image.png",
            ResourceKind::Video => "video.mp4",
        }
    }

    /// Attribute holding the asset URL
    pub fn attribute(self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "href",
            _ => "src",
        }
    }

    /// How the asset body is retrieved
    pub fn fetch_mode(self) -> FetchMode {
        match self {
            ResourceKind::Stylesheet | ResourceKind::Script => FetchMode::Text,
            ResourceKind::Image | ResourceKind::Video => FetchMode::Binary,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Stylesheet => write!(f, "stylesheet"),
            ResourceKind::Script => write!(f, "script"),
            ResourceKind::Image => write!(f, "image"),
            ResourceKind::Video => write!(f, "video"),
        }
    }
}

/// Body decoding mode for a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Decode the body as character data
    Text,
    /// Keep the raw bytes
    Binary,
}

/// Body of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Text(String),
    Binary(bytes::Bytes),
}

impl Fetched {
    /// Consume into text, decoding binary bodies lossily
    pub fn into_text(self) -> String {
        match self {
            Fetched::Text(text) => text,
            Fetched::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Consume into raw bytes
    pub fn into_bytes(self) -> bytes::Bytes {
        match self {
            Fetched::Text(text) => bytes::Bytes::from(text),
            Fetched::Binary(bytes) => bytes,
        }
    }
}

/// How destination names that collide within one kind are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Later references get `stem-1.ext`, `stem-2.ext`, ... in document order
    #[default]
    Suffix,
    /// Colliding references share one file; the last writer wins
    Overwrite,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "suffix" => Ok(CollisionPolicy::Suffix),
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            _ => Err("Invalid collision policy: must be suffix or overwrite".to_string()),
        }
    }
}

/// One asset reference discovered in the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReference {
    /// Asset category
    pub kind: ResourceKind,
    /// Attribute value exactly as found in the source document
    pub original_value: String,
    /// Absolute URL the asset is fetched from
    pub resolved_url: String,
    /// Path relative to the output root, e.g. `css/a.css`
    pub destination_path: String,
    /// Element owning the attribute
    #[serde(skip)]
    pub owner: NodeId,
}

/// A reference whose task settled with an error
#[derive(Debug, Serialize)]
pub struct FailedReference {
    pub reference: ResourceReference,
    /// Human readable cause
    pub reason: String,
    #[serde(skip)]
    pub error: ResourceError,
}

impl FailedReference {
    pub fn new(reference: ResourceReference, error: ResourceError) -> Self {
        Self {
            reason: error.to_string(),
            reference,
            error,
        }
    }
}

/// Lifecycle of a mirror job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Created,
    FetchingRoot,
    ExtractingReferences,
    Downloading,
    Finalizing,
    Completed,
    Failed,
}

impl JobStatus {
    /// True once the job can no longer change state
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Created => "created",
            JobStatus::FetchingRoot => "fetching_root",
            JobStatus::ExtractingReferences => "extracting_references",
            JobStatus::Downloading => "downloading",
            JobStatus::Finalizing => "finalizing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A single mirroring request and its current state
#[derive(Debug, Clone, Serialize)]
pub struct MirrorJob {
    pub source_url: String,
    pub output_root: PathBuf,
    pub status: JobStatus,
}

impl MirrorJob {
    pub fn new(source_url: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            output_root: output_root.into(),
            status: JobStatus::Created,
        }
    }
}

/// Progress snapshot handed to status callbacks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorProgress {
    /// Job state at the time of the snapshot
    pub status: JobStatus,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Reference tasks settled so far
    pub settled: usize,
    /// Reference tasks dispatched in total
    pub total: usize,
}

impl MirrorProgress {
    /// Create a new snapshot for a status
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            message: None,
            settled: 0,
            total: 0,
        }
    }

    /// Set message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set task counters
    pub fn with_counts(mut self, settled: usize, total: usize) -> Self {
        self.settled = settled;
        self.total = total;
        self
    }
}

/// Outcome of a completed mirror job
///
/// Both lists are in document order. A job with failed references is still
/// complete; inspect [`failed`](Self::failed) to tell partial from total
/// success.
#[derive(Debug, Serialize)]
pub struct MirrorResult {
    pub source_url: String,
    pub output_root: PathBuf,
    /// Location of the rewritten page
    pub index_path: PathBuf,
    pub succeeded: Vec<ResourceReference>,
    pub failed: Vec<FailedReference>,
}

impl MirrorResult {
    /// True when every reference was mirrored
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of references discovered in the page
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
