//! Output tree persistence

use crate::error::{MirrorError, ResourceError};
use crate::types::ResourceKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File name of the rewritten page
pub const INDEX_FILE: &str = "index.html";

/// Writes assets and the final page below one output root
///
/// Directory creation is recursive and therefore idempotent; concurrent
/// writers may create the same directory.
#[derive(Debug, Clone)]
pub struct AssetWriter {
    root: PathBuf,
}

impl AssetWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a destination path such as `css/a.css`
    pub fn path_for(&self, destination_path: &str) -> PathBuf {
        destination_path
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Create the four asset subdirectories
    pub async fn prepare(&self) -> Result<(), MirrorError> {
        for kind in ResourceKind::ALL {
            let dir = self.root.join(kind.dir());
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| MirrorError::Io { path: dir, source })?;
        }
        Ok(())
    }

    /// Persist one asset, replacing any file already at that path
    pub async fn write(
        &self,
        destination_path: &str,
        content: &[u8],
    ) -> Result<PathBuf, ResourceError> {
        let path = self.path_for(destination_path);
        write_file(&path, content)
            .await
            .map_err(|source| ResourceError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Persist the serialized page as `index.html`
    pub async fn write_index(&self, html: &str) -> Result<PathBuf, MirrorError> {
        let path = self.root.join(INDEX_FILE);
        write_file(&path, html.as_bytes())
            .await
            .map_err(|source| MirrorError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

async fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await
}
