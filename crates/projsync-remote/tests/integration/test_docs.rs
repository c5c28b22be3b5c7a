//! Listing, uploading and deleting project documents

use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use projsync_core::domain::newtypes::{RelativePath, RemoteId};
use projsync_core::fingerprint;
use projsync_core::ports::IRemoteStore;

use crate::common::{self, DOCS_PATH, SESSION_KEY};

#[tokio::test]
async fn test_list_files_fingerprints_content() {
    let (server, store) = common::setup_store_mock().await;
    common::mount_docs(
        &server,
        serde_json::json!([
            {
                "uuid": "doc-1",
                "file_name": "README.md",
                "content": "hello\r\n",
                "created_at": "2026-01-15T10:00:00Z"
            },
            {
                "uuid": "doc-2",
                "file_name": "src/lib.rs",
                "content": "pub fn f() {}",
                "created_at": "2026-01-15T10:00:01Z"
            }
        ]),
    )
    .await;

    let entries = store.list_files(&common::scope()).await.expect("list failed");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path.as_str(), "README.md");
    assert_eq!(entries[0].remote_id.as_str(), "doc-1");
    assert_eq!(entries[0].fingerprint, fingerprint::normalized("hello"));
    assert_eq!(entries[1].path.as_str(), "src/lib.rs");
}

#[tokio::test]
async fn test_list_files_keeps_duplicates() {
    let (server, store) = common::setup_store_mock().await;
    common::mount_docs(
        &server,
        serde_json::json!([
            {"uuid": "doc-1", "file_name": "a.txt", "content": "one"},
            {"uuid": "doc-2", "file_name": "a.txt", "content": "two"}
        ]),
    )
    .await;

    let entries = store.list_files(&common::scope()).await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_list_files_skips_unusable_names() {
    let (server, store) = common::setup_store_mock().await;
    common::mount_docs(
        &server,
        serde_json::json!([
            {"uuid": "doc-1", "file_name": "README.md", "content": "hi"},
            {"uuid": "doc-2", "file_name": "../notes.md", "content": "up"},
            {"uuid": "doc-3", "file_name": "/etc/passwd", "content": "abs"},
            {"uuid": "doc-4", "file_name": "", "content": "empty"},
            {"uuid": "doc-5", "file_name": "docs/guide.md", "content": "guide"}
        ]),
    )
    .await;

    let entries = store.list_files(&common::scope()).await.unwrap();

    let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["README.md", "docs/guide.md"]);
    assert_eq!(entries[1].remote_id.as_str(), "doc-5");
}

#[tokio::test]
async fn test_upload_posts_name_and_content() {
    let (server, store) = common::setup_store_mock().await;
    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .and(header("Authorization", format!("Bearer {SESSION_KEY}").as_str()))
        .and(body_json(serde_json::json!({
            "file_name": "docs/guide.md",
            "content": "# Guide\n"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uuid": "doc-new",
            "file_name": "docs/guide.md",
            "content": "# Guide\n",
            "created_at": "2026-01-15T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let path = RelativePath::new("docs/guide.md").unwrap();
    let entry = store
        .upload_file(&common::scope(), &path, "# Guide\n")
        .await
        .expect("upload failed");

    assert_eq!(entry.remote_id.as_str(), "doc-new");
    assert_eq!(entry.path, path);
    assert_eq!(entry.fingerprint, fingerprint::normalized("# Guide"));
}

#[tokio::test]
async fn test_delete_targets_document_uuid() {
    let (server, store) = common::setup_store_mock().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{DOCS_PATH}/doc-7")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store
        .delete_file(&common::scope(), &RemoteId::new("doc-7").unwrap())
        .await
        .expect("delete failed");
}
