//! Bounded, most-recent-first log of sync events kept with the settings.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Entries kept before the oldest is dropped.
pub const LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl SyncLogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SyncLogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"), self.message)
    }
}

/// Ring buffer of sync log entries, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncLog {
    entries: VecDeque<SyncLogEntry>,
}

impl SyncLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message, evicting the oldest entry past capacity.
    pub fn push(&mut self, message: impl Into<String>) {
        self.push_entry(SyncLogEntry::new(message));
    }

    pub fn push_entry(&mut self, entry: SyncLogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(LOG_CAPACITY);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &SyncLogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&SyncLogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append entries from another log (e.g. one run's log) keeping order.
    pub fn extend_from(&mut self, other: &SyncLog) {
        for entry in other.entries.iter().rev() {
            self.push_entry(entry.clone());
        }
    }
}
