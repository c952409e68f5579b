// Tests for reconciliation planning

use gitsync::remote::{RemoteEntry, RemoteSet};
use gitsync::sync::{plan, ExclusionRules, PathSet, PlannedOp, SyncStrategy};
use proptest::prelude::*;

fn scenario() -> (PathSet, RemoteSet) {
    let local: PathSet = ["notes/a.md", "notes/b.md"]
        .iter()
        .map(|p| p.to_string())
        .collect();
    let remote: RemoteSet = vec![
        RemoteEntry::new("notes/a.md", "tokenA"),
        RemoteEntry::new("notes/c.md", "tokenC"),
    ]
    .into_iter()
    .collect();
    (local, remote)
}

#[test]
fn test_local_to_remote_scenario() {
    let (local, remote) = scenario();
    let ops = plan(SyncStrategy::LocalToRemote, &local, &remote, &ExclusionRules::new());

    assert_eq!(
        ops,
        vec![
            PlannedOp::Upload { path: "notes/a.md".into(), token: Some("tokenA".into()) },
            PlannedOp::Upload { path: "notes/b.md".into(), token: None },
            PlannedOp::DeleteRemote { path: "notes/c.md".into(), token: "tokenC".into() },
        ]
    );
}

#[test]
fn test_remote_to_local_scenario() {
    let (local, remote) = scenario();
    let ops = plan(SyncStrategy::RemoteToLocal, &local, &remote, &ExclusionRules::new());

    assert_eq!(
        ops,
        vec![
            PlannedOp::Download { path: "notes/a.md".into() },
            PlannedOp::Download { path: "notes/c.md".into() },
        ]
    );
    assert!(ops.iter().all(|op| op.path() != "notes/b.md"));
}

#[test]
fn test_merge_scenario() {
    let (local, remote) = scenario();
    let ops = plan(SyncStrategy::Merge, &local, &remote, &ExclusionRules::new());

    assert_eq!(
        ops,
        vec![
            PlannedOp::Upload { path: "notes/b.md".into(), token: None },
            PlannedOp::Download { path: "notes/c.md".into() },
        ]
    );
}

#[test]
fn test_empty_sides_plan_nothing() {
    for strategy in SyncStrategy::ALL {
        assert!(plan(strategy, &PathSet::new(), &RemoteSet::new(), &ExclusionRules::new()).is_empty());
    }
}

#[test]
fn test_excluded_remote_entries_are_not_downloaded() {
    let remote: RemoteSet = vec![
        RemoteEntry::new("node_modules/x/index.js", "n"),
        RemoteEntry::new("a.md", "a"),
    ]
    .into_iter()
    .collect();

    let ops = plan(
        SyncStrategy::RemoteToLocal,
        &PathSet::new(),
        &remote,
        &ExclusionRules::with_defaults(),
    );
    assert_eq!(ops, vec![PlannedOp::Download { path: "a.md".into() }]);
}

fn path_strategy() -> impl Strategy<Value = String> {
    "[a-c]{1,2}(/[a-c]{1,2})?"
}

fn sides() -> impl Strategy<Value = (PathSet, RemoteSet)> {
    (
        prop::collection::btree_set(path_strategy(), 0..8),
        prop::collection::btree_map(path_strategy(), "[0-9a-f]{6}", 0..8),
    )
        .prop_map(|(local, remote)| {
            let remote: RemoteSet = remote
                .into_iter()
                .map(|(path, token)| RemoteEntry::new(path, token))
                .collect();
            (local, remote)
        })
}

proptest! {
    #[test]
    fn prop_merge_never_deletes_or_overwrites((local, remote) in sides()) {
        let ops = plan(SyncStrategy::Merge, &local, &remote, &ExclusionRules::new());

        prop_assert!(ops.iter().all(|op| !op.is_delete()));
        for op in &ops {
            let on_both = local.contains(op.path()) && remote.contains(op.path());
            prop_assert!(!on_both, "merge touched {}", op.path());
        }
        for op in ops.iter().filter(|op| op.is_upload()) {
            prop_assert_eq!(op, &PlannedOp::Upload { path: op.path().to_string(), token: None });
        }
    }

    #[test]
    fn prop_local_to_remote_covers_both_sides((local, remote) in sides()) {
        let ops = plan(SyncStrategy::LocalToRemote, &local, &remote, &ExclusionRules::new());

        let uploads: PathSet = ops.iter().filter(|o| o.is_upload()).map(|o| o.path().to_string()).collect();
        prop_assert_eq!(&uploads, &local);
        for op in &ops {
            match op {
                PlannedOp::Upload { path, token } => {
                    prop_assert_eq!(token.as_deref(), remote.token(path));
                }
                PlannedOp::DeleteRemote { path, token } => {
                    prop_assert!(!local.contains(path));
                    prop_assert_eq!(Some(token.as_str()), remote.token(path));
                }
                PlannedOp::Download { .. } => {
                    prop_assert!(false, "local_to_remote never downloads");
                }
            }
        }
    }

    #[test]
    fn prop_remote_to_local_never_writes_remote((local, remote) in sides()) {
        let ops = plan(SyncStrategy::RemoteToLocal, &local, &remote, &ExclusionRules::new());

        prop_assert!(ops.iter().all(|op| op.is_download()));
        prop_assert_eq!(ops.len(), remote.len());
    }
}
