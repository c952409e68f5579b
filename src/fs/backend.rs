use async_trait::async_trait;

use crate::error::Result;
use crate::fs::types::DirListing;

/// Host storage the engine reads from and writes to.
///
/// Paths are normalized relative paths (`/`-separated, no leading slash);
/// the empty string is the storage root.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    // ========== Listing ==========

    /// List a directory, returning child paths relative to the root
    async fn list_dir(&self, path: &str) -> Result<DirListing>;

    /// Check whether a file or directory exists
    async fn exists(&self, path: &str) -> Result<bool>;

    // ========== File Transfer ==========

    /// Read a whole file
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Write a whole file, replacing any previous content
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Create a directory. Must fail if the path already exists.
    async fn create_dir(&self, path: &str) -> Result<()>;

    // ========== Helpers ==========

    /// Create a directory unless it is already there.
    ///
    /// A concurrent creator winning the race is not an error.
    async fn mkdir_if_absent(&self, path: &str) -> Result<()> {
        if path.is_empty() || self.exists(path).await? {
            return Ok(());
        }
        match self.create_dir(path).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if self.exists(path).await.unwrap_or(false) {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Create every missing ancestor directory of `path`, outermost first.
    async fn ensure_parent_dirs(&self, path: &str) -> Result<()> {
        let mut prefix = String::new();
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop();
        for segment in segments.into_iter().filter(|s| !s.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            self.mkdir_if_absent(&prefix).await?;
        }
        Ok(())
    }

    /// Display form of a path for logs
    fn display_path(&self, path: &str) -> String {
        path.to_string()
    }
}
