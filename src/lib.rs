// Library module for gitsync
// Re-exports modules for use in integration tests and the binary

pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod remote;
pub mod sync;

pub use config::{Settings, SettingsStore};
pub use error::{Result, SyncError};
pub use sync::{SyncEngine, SyncStrategy, SyncSummary};
