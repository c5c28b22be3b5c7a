//! Project directory endpoints

use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use projsync_core::ports::IRemoteStore;

use crate::common::{self, PROJECTS_PATH};

#[tokio::test]
async fn test_list_projects_marks_archived() {
    let (server, store) = common::setup_store_mock().await;
    common::mount_projects(
        &server,
        serde_json::json!([
            {"uuid": "p-1", "name": "Shop", "archived_at": null},
            {"uuid": "p-2", "name": "Shop-SubModule-api", "archived_at": "2026-01-01T00:00:00Z"}
        ]),
    )
    .await;

    let projects = store.list_projects(&common::organization()).await.unwrap();

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id.as_str(), "p-1");
    assert!(!projects[0].archived);
    assert!(projects[1].archived);
}

#[tokio::test]
async fn test_create_project_sends_private_project() {
    let (server, store) = common::setup_store_mock().await;
    Mock::given(method("POST"))
        .and(path(PROJECTS_PATH))
        .and(body_json(serde_json::json!({
            "name": "Shop-SubModule-api",
            "description": "Submodule api of Shop",
            "is_private": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "uuid": "p-9",
            "name": "Shop-SubModule-api",
            "archived_at": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let project = store
        .create_project(&common::organization(), "Shop-SubModule-api", "Submodule api of Shop")
        .await
        .expect("create failed");

    assert_eq!(project.id.as_str(), "p-9");
    assert_eq!(project.name, "Shop-SubModule-api");
    assert!(!project.archived);
}
