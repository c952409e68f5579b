use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One blob in the remote tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub path: String,
    /// Content-addressed update token (blob sha). Opaque; threaded through to
    /// updates and deletes of this exact blob.
    pub token: String,
}

impl RemoteEntry {
    pub fn new(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            token: token.into(),
        }
    }
}

/// Path-unique, ordered listing of remote blobs. Built fresh for every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSet {
    entries: Vec<RemoteEntry>,
    index: HashMap<String, usize>,
}

impl RemoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; a repeated path keeps the first entry.
    pub fn push(&mut self, entry: RemoteEntry) -> bool {
        if self.contains(&entry.path) {
            return false;
        }
        self.index.insert(entry.path.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, path: &str) -> Option<&RemoteEntry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    pub fn token(&self, path: &str) -> Option<&str> {
        self.get(path).map(|e| e.token.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RemoteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RemoteEntry> for RemoteSet {
    fn from_iter<I: IntoIterator<Item = RemoteEntry>>(iter: I) -> Self {
        let mut set = RemoteSet::new();
        for entry in iter {
            set.push(entry);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RemoteSet {
    type Item = &'a RemoteEntry;
    type IntoIter = std::slice::Iter<'a, RemoteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A downloaded file: decoded bytes plus its current token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    pub token: String,
}

/// Remote repository operations used by the sync engine.
///
/// Every call is a single request against one branch.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Recursive listing of every blob reachable from the branch.
    async fn list_tree(&self) -> Result<RemoteSet>;

    /// Read one file.
    async fn get_file(&self, path: &str) -> Result<RemoteFile>;

    /// Create or update a file and return its new token.
    ///
    /// With `token`, the remote's current blob must match or the call fails
    /// with a conflict. Without it, the call only succeeds if the path does
    /// not exist yet.
    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        token: Option<&str>,
        message: &str,
    ) -> Result<String>;

    /// Delete a file; fails if `token` is stale.
    async fn delete_file(&self, path: &str, token: &str, message: &str) -> Result<()>;

    /// Short description for logs, e.g. `owner/repo@main`.
    fn describe(&self) -> String;
}
