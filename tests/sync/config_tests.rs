// Tests for persisted settings

use gitsync::sync::{ExclusionRules, SyncStrategy};
use gitsync::{SettingsStore, SyncError};
use tempfile::TempDir;

#[test]
fn test_missing_file_loads_defaults() {
    let dir = TempDir::new().unwrap();
    let store = SettingsStore::load(dir.path().join("config.toml")).unwrap();

    assert_eq!(store.settings().branch, "main");
    assert!(store.settings().log.is_empty());
    let rules = store.settings().exclusion_rules().unwrap();
    assert!(rules.is_excluded(".git/HEAD"));
}

#[test]
fn test_update_persists_and_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let mut store = SettingsStore::load(&path).unwrap();

    store
        .update(|s| {
            s.token = "ghp_test".into();
            s.repository = "octo/notes".into();
            s.branch = "drafts".into();
            s.idle_sync_secs = 30;
            s.add_exclusion("*.pdf")?;
            Ok(())
        })
        .unwrap();

    let reloaded = SettingsStore::load(&path).unwrap();
    assert_eq!(reloaded.settings(), store.settings());
    assert_eq!(reloaded.settings().branch, "drafts");
    assert!(reloaded.settings().exclusion_rules().unwrap().is_excluded("books/a.pdf"));
    assert!(!path.with_extension("toml.tmp").exists());
}

#[test]
fn test_failed_update_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let mut store = SettingsStore::load(&path).unwrap();
    store
        .update(|s| {
            s.token = "ghp_old".into();
            s.token_locked = true;
            Ok(())
        })
        .unwrap();
    let on_disk = std::fs::read_to_string(&path).unwrap();

    let err = store
        .update(|s| {
            s.branch = "changed".into();
            s.set_token("ghp_new")?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<SyncError>(), Some(SyncError::TokenLocked)));
    assert_eq!(store.settings().token, "ghp_old");
    assert_eq!(store.settings().branch, "main");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);
}

#[test]
fn test_exclusion_edits_are_deduplicated() {
    let dir = TempDir::new().unwrap();
    let mut store = SettingsStore::load(dir.path().join("config.toml")).unwrap();
    let before = store.settings().exclusion_rules.clone();

    assert!(store.update(|s| Ok(s.add_exclusion("drafts")?)).unwrap());
    assert!(!store.update(|s| Ok(s.add_exclusion("drafts")?)).unwrap());
    assert_eq!(store.settings().exclusion_rules.len(), before.len() + 1);

    assert!(store.update(|s| Ok(s.remove_exclusion("drafts"))).unwrap());
    assert_eq!(store.settings().exclusion_rules, before);
}

#[test]
fn test_log_survives_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let mut store = SettingsStore::load(&path).unwrap();

    store
        .update(|s| {
            s.log.push("first");
            s.log.push(format!("{} finished", SyncStrategy::Merge.label()));
            Ok(())
        })
        .unwrap();

    let reloaded = SettingsStore::load(&path).unwrap();
    let messages: Vec<_> = reloaded
        .settings()
        .log
        .entries()
        .map(|e| e.message.clone())
        .collect();
    assert_eq!(messages, vec!["Merge sync finished", "first"]);
}

#[test]
fn test_cleared_rules_exclude_nothing() {
    let dir = TempDir::new().unwrap();
    let mut store = SettingsStore::load(dir.path().join("config.toml")).unwrap();

    store
        .update(|s| {
            s.exclusion_rules.clear();
            Ok(())
        })
        .unwrap();

    let rules: ExclusionRules = store.settings().exclusion_rules().unwrap();
    assert!(rules.is_empty());
    assert!(!rules.is_excluded(".git/config"));
}
