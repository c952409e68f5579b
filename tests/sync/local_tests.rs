// Tests for local enumeration and downloads against the real filesystem

use std::fs;
use std::sync::Arc;

use gitsync::fs::LocalBackend;
use gitsync::sync::{ExclusionRules, SyncEngine, SyncStrategy};
use tempfile::TempDir;

use crate::support::MemoryRemote;

fn vault() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("notes/daily")).unwrap();
    fs::create_dir_all(root.join(".git/objects")).unwrap();
    fs::create_dir_all(root.join(".obsidian")).unwrap();
    fs::write(root.join("notes/a.md"), "a").unwrap();
    fs::write(root.join("notes/daily/2024-01-01.md"), "day").unwrap();
    fs::write(root.join(".git/objects/ab"), "blob").unwrap();
    fs::write(root.join(".git/HEAD"), "ref").unwrap();
    fs::write(root.join(".obsidian/app.json"), "{}").unwrap();
    fs::write(root.join(".obsidian/workspace.json"), "{}").unwrap();
    fs::write(root.join(".gitignore"), "target").unwrap();
    tmp
}

fn engine(root: &TempDir, remote: &Arc<MemoryRemote>) -> SyncEngine {
    SyncEngine::new(Arc::new(LocalBackend::new(root.path())), remote.clone())
}

#[tokio::test]
async fn test_list_local_walks_tree_and_keeps_hidden_files() {
    let tmp = vault();
    let remote = Arc::new(MemoryRemote::new());

    let files = engine(&tmp, &remote)
        .list_local(&ExclusionRules::with_defaults())
        .await
        .unwrap();

    let files: Vec<&str> = files.iter().map(String::as_str).collect();
    assert_eq!(
        files,
        vec![
            ".gitignore",
            ".obsidian/app.json",
            "notes/a.md",
            "notes/daily/2024-01-01.md",
        ]
    );
}

#[tokio::test]
async fn test_list_local_without_rules_lists_everything() {
    let tmp = vault();
    let remote = Arc::new(MemoryRemote::new());

    let files = engine(&tmp, &remote)
        .list_local(&ExclusionRules::new())
        .await
        .unwrap();

    assert_eq!(files.len(), 7);
    assert!(files.contains(".git/objects/ab"));
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("gone");
    let remote = Arc::new(MemoryRemote::new());
    let engine = SyncEngine::new(Arc::new(LocalBackend::new(missing)), remote.clone());

    assert!(engine
        .run(SyncStrategy::LocalToRemote, &ExclusionRules::new())
        .await
        .is_err());
    assert!(remote.writes().is_empty());
}

#[tokio::test]
async fn test_round_trip_through_remote() {
    let source = vault();
    let remote = Arc::new(MemoryRemote::new());
    let rules = ExclusionRules::with_defaults();

    engine(&source, &remote)
        .run(SyncStrategy::LocalToRemote, &rules)
        .await
        .unwrap();

    let target = TempDir::new().unwrap();
    let summary = engine(&target, &remote)
        .run(SyncStrategy::RemoteToLocal, &rules)
        .await
        .unwrap();

    assert!(summary.is_clean());
    assert_eq!(summary.downloaded, 4);
    assert_eq!(
        fs::read_to_string(target.path().join("notes/daily/2024-01-01.md")).unwrap(),
        "day"
    );
    assert!(!target.path().join(".git").exists());
}

#[tokio::test]
async fn test_download_overwrites_existing_file() {
    let tmp = vault();
    let remote = Arc::new(MemoryRemote::with_files(&[("notes/a.md", b"from remote")]));

    engine(&tmp, &remote)
        .run(SyncStrategy::RemoteToLocal, &ExclusionRules::with_defaults())
        .await
        .unwrap();

    assert_eq!(fs::read(tmp.path().join("notes/a.md")).unwrap(), b"from remote");
    assert!(tmp.path().join(".gitignore").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_to_ancestor_is_not_mirrored() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("notes")).unwrap();
    fs::write(tmp.path().join("notes/a.md"), "a").unwrap();
    std::os::unix::fs::symlink(tmp.path(), tmp.path().join("notes/up")).unwrap();
    let remote = Arc::new(MemoryRemote::new());

    let summary = engine(&tmp, &remote)
        .run(SyncStrategy::LocalToRemote, &ExclusionRules::new())
        .await
        .unwrap();

    assert!(summary.is_clean());
    assert_eq!(summary.uploaded, 1);
    assert_eq!(remote.paths().into_iter().collect::<Vec<_>>(), vec!["notes/a.md"]);
}
