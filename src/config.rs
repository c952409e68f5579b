//! Persisted settings.
//!
//! `Settings` is a plain value owned by the caller and passed by reference
//! into each run. `SettingsStore` is the only way to change it: every update
//! is written to disk atomically before it becomes visible.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SyncError;
use crate::remote::github::split_repository;
use crate::sync::exclude::{ExclusionRules, DEFAULT_EXCLUDES};
use crate::sync::log::SyncLog;
use crate::sync::throttle::RequestRate;

const APP_DIR: &str = "gitsync";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API token sent as a bearer credential.
    pub token: String,
    /// `owner/name`.
    pub repository: String,
    pub branch: String,
    /// Fixed-interval sync period in seconds; 0 disables it.
    pub sync_interval_secs: u64,
    /// Sync delay after the last edit in seconds; 0 disables it.
    pub idle_sync_secs: u64,
    pub exclusion_rules: Vec<String>,
    /// When set, the token cannot be edited.
    pub token_locked: bool,
    /// Remote request pacing; 0 disables it.
    pub requests_per_second: u32,
    pub log: SyncLog,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: String::new(),
            repository: String::new(),
            branch: "main".to_string(),
            sync_interval_secs: 0,
            idle_sync_secs: 0,
            exclusion_rules: DEFAULT_EXCLUDES.iter().map(|r| r.to_string()).collect(),
            token_locked: false,
            requests_per_second: RequestRate::default().per_second,
            log: SyncLog::new(),
        }
    }
}

impl Settings {
    /// Check that a run can be attempted.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.token.trim().is_empty() {
            return Err(SyncError::missing("token"));
        }
        if self.repository.trim().is_empty() {
            return Err(SyncError::missing("repository"));
        }
        split_repository(&self.repository)?;
        if self.branch.trim().is_empty() {
            return Err(SyncError::missing("branch"));
        }
        Ok(())
    }

    /// Compile the configured exclusion rules.
    pub fn exclusion_rules(&self) -> crate::error::Result<ExclusionRules> {
        ExclusionRules::from_rules(&self.exclusion_rules)
    }

    /// Add a rule; returns false for blank or duplicate rules.
    pub fn add_exclusion(&mut self, rule: &str) -> crate::error::Result<bool> {
        let mut rules = self.exclusion_rules()?;
        if !rules.add_rule(rule)? {
            return Ok(false);
        }
        self.exclusion_rules = rules.rules();
        Ok(true)
    }

    pub fn remove_exclusion(&mut self, rule: &str) -> bool {
        let rule = rule.trim();
        let before = self.exclusion_rules.len();
        self.exclusion_rules.retain(|r| r != rule);
        self.exclusion_rules.len() != before
    }

    pub fn set_token(&mut self, token: &str) -> crate::error::Result<()> {
        if self.token_locked {
            return Err(SyncError::TokenLocked);
        }
        self.token = token.trim().to_string();
        Ok(())
    }

    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync_interval_secs > 0).then(|| Duration::from_secs(self.sync_interval_secs))
    }

    pub fn idle_delay(&self) -> Option<Duration> {
        (self.idle_sync_secs > 0).then(|| Duration::from_secs(self.idle_sync_secs))
    }

    pub fn request_rate(&self) -> RequestRate {
        RequestRate::new(self.requests_per_second)
    }
}

/// Settings bound to the file they persist to.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// `<config dir>/gitsync/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load settings from `path`; a missing file yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings: {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse settings: {}", path.display()))?
        } else {
            Settings::default()
        };
        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply `change` to a copy, persist it, then make it current.
    ///
    /// If `change` or the write fails, the current settings are untouched.
    pub fn update<F, R>(&mut self, change: F) -> Result<R>
    where
        F: FnOnce(&mut Settings) -> Result<R>,
    {
        let mut next = self.settings.clone();
        let result = change(&mut next)?;
        write_atomic(&self.path, &next)?;
        self.settings = next;
        Ok(result)
    }
}

/// Write to a sibling temp file and rename it over the target.
fn write_atomic(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, text)
        .with_context(|| format!("Failed to write settings: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace settings: {}", path.display()))?;
    Ok(())
}
