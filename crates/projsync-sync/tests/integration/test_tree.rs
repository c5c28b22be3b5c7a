//! Main root plus submodule sessions

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use projsync_core::ports::RemoteError;
use projsync_sync::engine::SyncProgress;
use projsync_sync::session::TreeSyncRequest;
use projsync_sync::SyncError;

use crate::common::{runner, scope, write_tree, MemoryRemoteStore, Op};

fn shop_tree(root: &Path) {
    write_tree(
        root,
        &[
            ("README.md", "shop"),
            ("api/Cargo.toml", "[package]"),
            ("api/src/lib.rs", "pub fn api() {}"),
            ("web/package.json", "{}"),
            ("web/index.js", "main()"),
        ],
    );
}

fn request(root: &Path) -> TreeSyncRequest {
    TreeSyncRequest {
        root: root.to_path_buf(),
        scope: scope("org", "p-main"),
        project_name: Some("Shop".to_string()),
        submodule_markers: vec!["Cargo.toml".to_string(), "package.json".to_string()],
        include_submodules: false,
        sync_submodules: true,
        max_concurrent_sessions: 1,
    }
}

fn shop_projects(store: &MemoryRemoteStore) {
    store.add_project("org", "p-main", "Shop", false);
    store.add_project("org", "p-api", "Shop-SubModule-api", false);
    store.add_project("org", "p-web", "Shop-SubModule-web", false);
}

#[tokio::test]
async fn test_submodules_sync_into_their_own_scopes() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    shop_projects(&store);

    let summary = runner(store.clone())
        .sync_tree(
            &request(dir.path()),
            Arc::new(SyncProgress::new()),
            CancellationToken::new(),
        )
        .await;

    assert!(summary.is_success());
    assert_eq!(store.paths(&scope("org", "p-main")), vec!["README.md"]);
    assert_eq!(
        store.paths(&scope("org", "p-api")),
        vec!["Cargo.toml", "src/lib.rs"]
    );
    assert_eq!(
        store.paths(&scope("org", "p-web")),
        vec!["index.js", "package.json"]
    );
    let labels: Vec<&str> = summary.sessions().map(|s| s.label()).collect();
    assert_eq!(labels, vec![".", "api", "web"]);
}

#[tokio::test]
async fn test_failing_submodule_does_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    shop_projects(&store);
    store.fail(
        Op::List,
        &scope("org", "p-api").to_string(),
        RemoteError::Permanent("gone".into()),
        None,
    );

    let summary = runner(store.clone())
        .sync_tree(
            &request(dir.path()),
            Arc::new(SyncProgress::new()),
            CancellationToken::new(),
        )
        .await;

    assert!(!summary.is_success());
    assert!(summary.main.result.is_ok());
    assert!(matches!(
        summary.submodules[0].result,
        Err(SyncError::Listing { .. })
    ));
    assert!(summary.submodules[1].result.is_ok());
    assert_eq!(store.paths(&scope("org", "p-main")), vec!["README.md"]);
    assert!(store.paths(&scope("org", "p-api")).is_empty());
    assert_eq!(store.paths(&scope("org", "p-web")).len(), 2);
}

#[tokio::test]
async fn test_unresolved_submodule_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    store.add_project("org", "p-api", "Shop-SubModule-api", false);
    store.add_project("org", "p-web-old", "Shop-SubModule-web", true);

    let summary = runner(store.clone())
        .sync_tree(
            &request(dir.path()),
            Arc::new(SyncProgress::new()),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(summary.submodules.len(), 1);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].root.relative.as_str(), "web");
    assert!(summary.skipped[0].reason.contains("Shop-SubModule-web"));
    assert!(!summary.is_success());
    assert_eq!(
        store.paths(&scope("org", "p-main")),
        vec!["README.md", "web/index.js", "web/package.json"]
    );
}

#[tokio::test]
async fn test_skipped_submodule_keeps_its_files_in_main_scope() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    store.add_project("org", "p-api", "Shop-SubModule-api", false);
    let main = scope("org", "p-main");
    store.seed(&main, "README.md", "shop");
    store.seed(&main, "web/index.js", "main()");
    store.seed(&main, "web/package.json", "{}");

    let summary = runner(store.clone())
        .sync_tree(
            &request(dir.path()),
            Arc::new(SyncProgress::new()),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].root.relative.as_str(), "web");
    let report = summary.main.result.as_ref().unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(report.uploaded, 0);
    assert_eq!(
        store.paths(&main),
        vec!["README.md", "web/index.js", "web/package.json"]
    );
    assert_eq!(store.paths(&scope("org", "p-api")).len(), 2);
}

#[tokio::test]
async fn test_no_submodules_keeps_every_file_in_main_scope() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    shop_projects(&store);
    let main = scope("org", "p-main");
    store.seed(&main, "api/src/lib.rs", "pub fn api() {}");
    let mut req = request(dir.path());
    req.sync_submodules = false;

    let summary = runner(store.clone())
        .sync_tree(&req, Arc::new(SyncProgress::new()), CancellationToken::new())
        .await;

    assert!(summary.is_success());
    assert!(summary.submodules.is_empty());
    assert!(summary.skipped.is_empty());
    let report = summary.main.result.as_ref().unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(store.paths(&main).len(), 5);
    assert!(store.paths(&scope("org", "p-api")).is_empty());
}

#[tokio::test]
async fn test_missing_project_name_skips_every_submodule() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    shop_projects(&store);
    let mut req = request(dir.path());
    req.project_name = None;

    let summary = runner(store.clone())
        .sync_tree(&req, Arc::new(SyncProgress::new()), CancellationToken::new())
        .await;

    assert!(summary.submodules.is_empty());
    assert_eq!(summary.skipped.len(), 2);
    assert!(!store.calls().contains(&crate::common::Call::ListProjects));
}

#[tokio::test]
async fn test_include_submodules_keeps_files_in_main_scope() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    let mut req = request(dir.path());
    req.include_submodules = true;
    req.sync_submodules = false;

    let summary = runner(store.clone())
        .sync_tree(&req, Arc::new(SyncProgress::new()), CancellationToken::new())
        .await;

    assert!(summary.is_success());
    assert!(summary.submodules.is_empty());
    assert_eq!(store.paths(&scope("org", "p-main")).len(), 5);
}

#[tokio::test]
async fn test_nested_submodule_is_excluded_from_its_parent() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("api/Cargo.toml", "[package]"),
            ("api/plugins/auth/Cargo.toml", "[package]"),
            ("api/plugins/auth/src/lib.rs", "auth"),
        ],
    );
    let store = MemoryRemoteStore::new();
    store.add_project("org", "p-api", "Shop-SubModule-api", false);
    store.add_project("org", "p-auth", "Shop-SubModule-auth", false);

    let summary = runner(store.clone())
        .sync_tree(
            &request(dir.path()),
            Arc::new(SyncProgress::new()),
            CancellationToken::new(),
        )
        .await;

    assert!(summary.is_success());
    assert_eq!(store.paths(&scope("org", "p-api")), vec!["Cargo.toml"]);
    assert_eq!(
        store.paths(&scope("org", "p-auth")),
        vec!["Cargo.toml", "src/lib.rs"]
    );
}

#[tokio::test]
async fn test_concurrent_sessions_report_in_path_order() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    shop_projects(&store);
    let mut req = request(dir.path());
    req.max_concurrent_sessions = 4;
    let progress = Arc::new(SyncProgress::new());

    let summary = runner(store.clone())
        .sync_tree(&req, Arc::clone(&progress), CancellationToken::new())
        .await;

    assert!(summary.is_success());
    let labels: Vec<&str> = summary.sessions().map(|s| s.label()).collect();
    assert_eq!(labels, vec![".", "api", "web"]);
    assert_eq!(progress.snapshot().uploaded, 5);
}

#[tokio::test]
async fn test_plan_tree_makes_no_changes() {
    let dir = tempfile::tempdir().unwrap();
    shop_tree(dir.path());
    let store = MemoryRemoteStore::new();
    shop_projects(&store);

    let summary = runner(store.clone()).plan_tree(&request(dir.path())).await;

    let main = summary.main.result.as_ref().unwrap();
    assert_eq!(main.uploads.len(), 1);
    assert_eq!(summary.submodules.len(), 2);
    assert!(store.mutations().is_empty());
}
