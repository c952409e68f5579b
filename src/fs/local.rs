use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::fs::backend::LocalStorage;
use crate::fs::types::{join_relative, DirListing};

/// Local filesystem storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    pub root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative path under the root.
    ///
    /// Absolute paths and `..` components are rejected so a remote path can
    /// never escape the root.
    fn full_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SyncError::storage(
                io::Error::new(io::ErrorKind::InvalidInput, "path escapes the sync root"),
                "resolving",
                relative,
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl LocalStorage for LocalBackend {
    async fn list_dir(&self, path: &str) -> Result<DirListing> {
        let dir = self.full_path(path)?;
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| SyncError::storage(e, "listing", &dir))?;

        let mut listing = DirListing::default();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| SyncError::storage(e, "listing", &dir))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| SyncError::storage(e, "inspecting", entry.path()))?;

            let relative = join_relative(path, &name);

            // Linked files sync as regular content. Linked directories are
            // never descended, so a link to an ancestor cannot loop.
            let is_dir = if file_type.is_symlink() {
                match tokio::fs::metadata(entry.path()).await {
                    Ok(meta) if meta.is_file() => false,
                    _ => {
                        debug!(path = %relative, "skipping directory or dangling symlink");
                        continue;
                    }
                }
            } else {
                file_type.is_dir()
            };

            if is_dir {
                listing.dirs.push(relative);
            } else {
                listing.files.push(relative);
            }
        }

        Ok(listing.sorted())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.full_path(path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| SyncError::storage(e, "checking", full))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.full_path(path)?;
        tokio::fs::read(&full)
            .await
            .map_err(|e| SyncError::storage(e, "reading", full))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full = self.full_path(path)?;
        tokio::fs::write(&full, data)
            .await
            .map_err(|e| SyncError::storage(e, "writing", full))
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let full = self.full_path(path)?;
        tokio::fs::create_dir(&full)
            .await
            .map_err(|e| SyncError::storage(e, "creating directory", full))
    }

    fn display_path(&self, path: &str) -> String {
        self.root.join(path).to_string_lossy().to_string()
    }
}
