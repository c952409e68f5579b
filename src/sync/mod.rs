//! Reconciliation between local storage and the remote repository.
//!
//! Exclusion rules, the transfer codec, planning for the three strategies,
//! and the engine that executes a plan file by file.

pub mod codec;
pub mod engine;
pub mod exclude;
pub mod hash;
pub mod log;
pub mod plan;
pub mod throttle;

pub use engine::{OpOutcome, OpStatus, SyncEngine, SyncOptions, SyncProgress, SyncSummary};
pub use exclude::{ExclusionRules, DEFAULT_EXCLUDES};
pub use log::{SyncLog, SyncLogEntry};
pub use plan::{plan, PathSet, PlannedOp, SyncStrategy};
pub use throttle::{RequestRate, RequestThrottle};
