//! Sync engine for reconciling local storage with a remote repository.
//!
//! Fetches both sides, plans transfers for the chosen strategy, then executes
//! them one at a time. A failed transfer is recorded and the run moves on;
//! only listing failures abort a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::fs::LocalStorage;
use crate::remote::{RemoteRepository, RemoteSet};
use crate::sync::exclude::ExclusionRules;
use crate::sync::hash;
use crate::sync::log::SyncLog;
use crate::sync::plan::{plan, PathSet, PlannedOp, SyncStrategy};
use crate::sync::throttle::RunTimer;

/// Engine options.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Skip an update whose local bytes already match the remote token.
    pub skip_unchanged: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            skip_unchanged: true,
        }
    }
}

/// What happened to one planned transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpStatus {
    /// The transfer was performed.
    Applied,
    /// An update was skipped because the remote already holds the same blob.
    Unchanged,
    /// The transfer failed; the run continued.
    Failed { reason: String },
}

/// Per-item result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpOutcome {
    pub op: PlannedOp,
    pub status: OpStatus,
}

impl OpOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, OpStatus::Failed { .. })
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub strategy: SyncStrategy,
    pub outcomes: Vec<OpOutcome>,
    pub uploaded: usize,
    pub downloaded: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub bytes_transferred: u64,
    pub duration: Duration,
    /// Messages produced by this run, newest first.
    pub log: SyncLog,
}

impl SyncSummary {
    fn new(strategy: SyncStrategy) -> Self {
        Self {
            strategy,
            outcomes: Vec::new(),
            uploaded: 0,
            downloaded: 0,
            deleted: 0,
            unchanged: 0,
            failed: 0,
            bytes_transferred: 0,
            duration: Duration::ZERO,
            log: SyncLog::new(),
        }
    }

    fn record(&mut self, op: PlannedOp, status: OpStatus) {
        match (&status, &op) {
            (OpStatus::Applied, PlannedOp::Upload { .. }) => self.uploaded += 1,
            (OpStatus::Applied, PlannedOp::Download { .. }) => self.downloaded += 1,
            (OpStatus::Applied, PlannedOp::DeleteRemote { .. }) => self.deleted += 1,
            (OpStatus::Unchanged, _) => self.unchanged += 1,
            (OpStatus::Failed { .. }, _) => self.failed += 1,
        }
        self.outcomes.push(OpOutcome { op, status });
    }

    /// Transfers that were performed or skipped as unchanged.
    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed
    }

    pub fn failures(&self) -> impl Iterator<Item = &OpOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// One-line description for logs.
    pub fn headline(&self) -> String {
        format!(
            "{} finished: {} uploaded, {} downloaded, {} deleted, {} unchanged, {} failed",
            self.strategy.label(),
            self.uploaded,
            self.downloaded,
            self.deleted,
            self.unchanged,
            self.failed
        )
    }
}

/// Progress update sent while transferring.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub current_file: String,
    pub files_done: usize,
    pub total_files: usize,
}

impl SyncProgress {
    /// Progress as a fraction (0.0 - 1.0).
    pub fn percentage(&self) -> f32 {
        if self.total_files == 0 {
            return 0.0;
        }
        self.files_done as f32 / self.total_files as f32
    }
}

/// Clears the busy flag when a run ends, however it ends.
struct RunGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(busy: &'a AtomicBool) -> Result<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::AlreadyRunning)?;
        Ok(Self { busy })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Sync engine for orchestrating reconciliation runs.
///
/// Share it behind an `Arc` between triggers; overlapping runs are rejected
/// with [`SyncError::AlreadyRunning`].
pub struct SyncEngine {
    local: Arc<dyn LocalStorage>,
    remote: Arc<dyn RemoteRepository>,
    options: SyncOptions,
    busy: AtomicBool,
    progress_tx: Option<tokio::sync::mpsc::Sender<SyncProgress>>,
}

impl SyncEngine {
    /// Create a new sync engine.
    pub fn new(local: Arc<dyn LocalStorage>, remote: Arc<dyn RemoteRepository>) -> Self {
        Self {
            local,
            remote,
            options: SyncOptions::default(),
            busy: AtomicBool::new(false),
            progress_tx: None,
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Send progress updates on `progress_tx` while transferring.
    pub fn with_progress(mut self, progress_tx: tokio::sync::mpsc::Sender<SyncProgress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    /// Whether a run currently holds the engine.
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    async fn send_progress(&self, progress: SyncProgress) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(progress).await;
        }
    }

    /// Recursively list local files, skipping excluded files and directories.
    pub async fn list_local(&self, exclude: &ExclusionRules) -> Result<PathSet> {
        let mut files = PathSet::new();
        let mut to_scan = vec![String::new()];

        while let Some(dir) = to_scan.pop() {
            let listing = self.local.list_dir(&dir).await?;

            for file in listing.files {
                if !exclude.is_excluded(&file) {
                    files.insert(file);
                }
            }
            for sub in listing.dirs {
                if !exclude.is_excluded(&sub) {
                    to_scan.push(sub);
                }
            }
        }

        Ok(files)
    }

    /// Fetch the remote tree. Never cached between runs.
    pub async fn list_remote(&self) -> Result<RemoteSet> {
        self.remote.list_tree().await
    }

    /// Compute the plan for `strategy` without transferring anything.
    pub async fn preview(&self, strategy: SyncStrategy, exclude: &ExclusionRules) -> Result<Vec<PlannedOp>> {
        let (local, remote) = tokio::try_join!(self.list_local(exclude), self.list_remote())?;
        Ok(plan(strategy, &local, &remote, exclude))
    }

    /// Perform one sync run.
    ///
    /// Returns `Err` only for fatal errors (listing failures or an overlapping
    /// run). Per-file failures are reported in the summary.
    pub async fn run(&self, strategy: SyncStrategy, exclude: &ExclusionRules) -> Result<SyncSummary> {
        let _guard = RunGuard::acquire(&self.busy)?;
        let mut timer = RunTimer::start();

        info!(strategy = %strategy, remote = %self.remote.describe(), "starting sync");
        let (local, remote) = tokio::try_join!(self.list_local(exclude), self.list_remote())?;
        debug!(local = local.len(), remote = remote.len(), "listed both sides");

        let ops = plan(strategy, &local, &remote, exclude);
        let total = ops.len();
        let mut summary = SyncSummary::new(strategy);

        for (done, op) in ops.into_iter().enumerate() {
            self.send_progress(SyncProgress {
                current_file: op.path().to_string(),
                files_done: done,
                total_files: total,
            })
            .await;

            let status = match self.execute(strategy, &op).await {
                Ok(Transfer::Bytes(bytes)) => {
                    debug!(op = %op, bytes, "transfer complete");
                    summary.bytes_transferred += bytes;
                    OpStatus::Applied
                }
                Ok(Transfer::Unchanged) => {
                    debug!(op = %op, "remote already up to date");
                    OpStatus::Unchanged
                }
                Err(err) => {
                    warn!(op = %op, error = %err, "transfer failed");
                    summary.log.push(format!("Failed to {}: {}", op, err));
                    OpStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            summary.record(op, status);
        }

        self.send_progress(SyncProgress {
            current_file: String::new(),
            files_done: total,
            total_files: total,
        })
        .await;

        timer.stop();
        summary.duration = timer.elapsed();
        summary.log.push(summary.headline());
        info!(
            strategy = %strategy,
            uploaded = summary.uploaded,
            downloaded = summary.downloaded,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "sync finished"
        );
        Ok(summary)
    }

    /// Perform a single planned transfer.
    async fn execute(&self, strategy: SyncStrategy, op: &PlannedOp) -> Result<Transfer> {
        let message = format!("{}: {}", strategy.label(), op.path());
        match op {
            PlannedOp::Upload { path, token } => {
                let data = self.local.read(path).await?;
                if let Some(token) = token.as_deref() {
                    if self.options.skip_unchanged && hash::matches_token(&data, token) {
                        return Ok(Transfer::Unchanged);
                    }
                }
                self.remote
                    .put_file(path, &data, token.as_deref(), &message)
                    .await?;
                Ok(Transfer::Bytes(data.len() as u64))
            }
            PlannedOp::Download { path } => {
                let file = self.remote.get_file(path).await?;
                self.local.ensure_parent_dirs(path).await?;
                self.local.write(path, &file.content).await?;
                debug!(target_file = %self.local.display_path(path), "wrote download");
                Ok(Transfer::Bytes(file.content.len() as u64))
            }
            PlannedOp::DeleteRemote { path, token } => {
                self.remote.delete_file(path, token, &message).await?;
                Ok(Transfer::Bytes(0))
            }
        }
    }
}

enum Transfer {
    Bytes(u64),
    Unchanged,
}
