//! Shared test helpers for project store integration tests
//!
//! Provides wiremock-based mock server setup for the docs and projects
//! endpoints. Each helper mounts the necessary mock endpoints against a
//! server created by [`setup_store_mock`].

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use projsync_core::domain::newtypes::{OrganizationId, ProjectId};
use projsync_core::domain::records::Scope;
use projsync_remote::{ApiClient, HttpRemoteStore};

pub const SESSION_KEY: &str = "sk-test-session";
pub const DOCS_PATH: &str = "/organizations/org-1/projects/proj-1/docs";
pub const PROJECTS_PATH: &str = "/organizations/org-1/projects";

pub fn scope() -> Scope {
    Scope::new(
        OrganizationId::new("org-1").unwrap(),
        ProjectId::new("proj-1").unwrap(),
    )
}

pub fn organization() -> OrganizationId {
    OrganizationId::new("org-1").unwrap()
}

/// Starts a mock server and returns a store pointing at it
pub async fn setup_store_mock() -> (MockServer, HttpRemoteStore) {
    let server = MockServer::start().await;
    let store = HttpRemoteStore::new(ApiClient::with_base_url(SESSION_KEY, server.uri()));
    (server, store)
}

/// Mounts `GET .../docs` returning the given documents
pub async fn mount_docs(server: &MockServer, docs: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .and(header("Authorization", format!("Bearer {SESSION_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs))
        .mount(server)
        .await;
}

/// Mounts `GET .../projects` returning the given projects
pub async fn mount_projects(server: &MockServer, projects: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(PROJECTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects))
        .mount(server)
        .await;
}

/// Mounts `GET .../docs` failing with `response`
pub async fn mount_docs_failure(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(DOCS_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}
