//! Reconciliation planning.
//!
//! Turns a local path set and a remote listing into the ordered list of
//! transfers a strategy calls for. Planning does no I/O, so plans can be
//! previewed and tested on their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::remote::RemoteSet;
use crate::sync::exclude::ExclusionRules;

/// Set of normalized relative local file paths.
pub type PathSet = BTreeSet<String>;

/// Sync policy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// Remote becomes an exact mirror of local, including deletions.
    LocalToRemote,
    /// Every remote file is written locally; local extras survive.
    RemoteToLocal,
    /// Copy files missing on either side; never overwrite or delete.
    Merge,
}

impl SyncStrategy {
    pub const ALL: [SyncStrategy; 3] = [
        SyncStrategy::LocalToRemote,
        SyncStrategy::RemoteToLocal,
        SyncStrategy::Merge,
    ];

    /// Trigger name used by callers and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalToRemote => "local_to_remote",
            Self::RemoteToLocal => "remote_to_local",
            Self::Merge => "merge",
        }
    }

    /// Human-readable label, also used as the commit message prefix.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LocalToRemote => "Sync local to remote",
            Self::RemoteToLocal => "Sync remote to local",
            Self::Merge => "Merge sync",
        }
    }

    /// Whether this strategy may delete remote files.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::LocalToRemote)
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local_to_remote" => Ok(Self::LocalToRemote),
            "remote_to_local" => Ok(Self::RemoteToLocal),
            "merge" => Ok(Self::Merge),
            other => Err(format!(
                "unknown sync mode '{}' (expected local_to_remote, remote_to_local or merge)",
                other
            )),
        }
    }
}

/// One planned transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedOp {
    /// Create (`token: None`) or update (`token: Some`) a remote file.
    Upload { path: String, token: Option<String> },
    /// Fetch a remote file and write it locally.
    Download { path: String },
    /// Delete a remote file at the given token.
    DeleteRemote { path: String, token: String },
}

impl PlannedOp {
    pub fn path(&self) -> &str {
        match self {
            Self::Upload { path, .. } => path,
            Self::Download { path } => path,
            Self::DeleteRemote { path, .. } => path,
        }
    }

    /// Short verb for logs.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Upload { token: None, .. } => "create",
            Self::Upload { token: Some(_), .. } => "update",
            Self::Download { .. } => "download",
            Self::DeleteRemote { .. } => "delete",
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload { .. })
    }

    pub fn is_download(&self) -> bool {
        matches!(self, Self::Download { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::DeleteRemote { .. })
    }
}

impl fmt::Display for PlannedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.path())
    }
}

/// Compute the transfers `strategy` calls for.
///
/// Uploads come first in local path order, then downloads or deletes in
/// remote listing order. Paths are matched by exact string equality.
pub fn plan(
    strategy: SyncStrategy,
    local: &PathSet,
    remote: &RemoteSet,
    exclude: &ExclusionRules,
) -> Vec<PlannedOp> {
    let local_paths = local.iter().filter(|p| !exclude.is_excluded(p));
    let remote_entries = remote.iter().filter(|e| !exclude.is_excluded(&e.path));

    let mut ops = Vec::new();
    match strategy {
        SyncStrategy::LocalToRemote => {
            for path in local_paths {
                ops.push(PlannedOp::Upload {
                    path: path.clone(),
                    token: remote.token(path).map(str::to_string),
                });
            }
            for entry in remote_entries {
                if !local.contains(&entry.path) {
                    ops.push(PlannedOp::DeleteRemote {
                        path: entry.path.clone(),
                        token: entry.token.clone(),
                    });
                }
            }
        }
        SyncStrategy::RemoteToLocal => {
            for entry in remote_entries {
                ops.push(PlannedOp::Download {
                    path: entry.path.clone(),
                });
            }
        }
        SyncStrategy::Merge => {
            for path in local_paths {
                if !remote.contains(path) {
                    ops.push(PlannedOp::Upload {
                        path: path.clone(),
                        token: None,
                    });
                }
            }
            for entry in remote_entries {
                if !local.contains(&entry.path) {
                    ops.push(PlannedOp::Download {
                        path: entry.path.clone(),
                    });
                }
            }
        }
    }
    ops
}
