//! Exclusion rules for sync operations.
//!
//! A rule is a literal path, a path with `*` wildcards, or a directory prefix.
//! A path is excluded when any rule matches it as an anchored wildcard
//! pattern, names one of its parent directories, or equals it verbatim.

use regex::Regex;

use crate::error::{Result, SyncError};

/// Rules excluded from every sync unless the user removes them.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Version control
    ".git",
    // Host workspace state
    ".obsidian/workspace.json",
    ".obsidian/workspace-mobile.json",
    // Dependencies
    "node_modules",
];

/// A single rule together with its compiled pattern.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: String,
    regex: Regex,
}

impl CompiledRule {
    fn compile(rule: &str) -> Result<Self> {
        let regex = Regex::new(&wildcard_to_regex(rule)).map_err(|source| SyncError::Pattern {
            rule: rule.to_string(),
            source,
        })?;
        Ok(Self {
            rule: rule.to_string(),
            regex,
        })
    }

    fn matches(&self, path: &str) -> bool {
        if path == self.rule {
            return true;
        }
        if let Some(rest) = path.strip_prefix(self.rule.as_str()) {
            if rest.starts_with('/') {
                return true;
            }
        }
        self.regex.is_match(path)
    }
}

/// Translate a user rule into an anchored regex.
///
/// Every regex metacharacter is escaped; `*` becomes `.*` and crosses `/`.
pub fn wildcard_to_regex(rule: &str) -> String {
    let body = rule
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    format!("^{}$", body)
}

/// Ordered, user-editable exclusion rule set.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    rules: Vec<CompiledRule>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ExclusionRules {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create with the built-in rules.
    pub fn with_defaults() -> Self {
        let mut rules = Self::new();
        for rule in DEFAULT_EXCLUDES {
            if let Ok(compiled) = CompiledRule::compile(rule) {
                rules.rules.push(compiled);
            }
        }
        rules
    }

    /// Create from a list of rules, keeping their order.
    pub fn from_rules<I, S>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for rule in rules {
            set.add_rule(rule.as_ref())?;
        }
        Ok(set)
    }

    /// Add a rule. Blank and duplicate rules are ignored and return `false`.
    pub fn add_rule(&mut self, rule: &str) -> Result<bool> {
        let rule = rule.trim();
        if rule.is_empty() || self.contains(rule) {
            return Ok(false);
        }
        self.rules.push(CompiledRule::compile(rule)?);
        Ok(true)
    }

    /// Remove a rule, returning whether it was present.
    pub fn remove_rule(&mut self, rule: &str) -> bool {
        let rule = rule.trim();
        let before = self.rules.len();
        self.rules.retain(|r| r.rule != rule);
        self.rules.len() != before
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.rules.iter().any(|r| r.rule == rule)
    }

    /// Check if a normalized relative path should be excluded.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.rules.iter().any(|r| r.matches(path))
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.rule.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
