//! HttpRemoteStore - IRemoteStore implementation over the project store API
//!
//! Wraps the [`ApiClient`] and translates between the API's JSON documents
//! and the port-level records.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use projsync_core::domain::newtypes::{OrganizationId, ProjectId, RelativePath, RemoteId};
use projsync_core::domain::records::{RemoteFileEntry, RemoteProject, Scope};
use projsync_core::fingerprint;
use projsync_core::ports::{IRemoteStore, RemoteError};

use crate::client::ApiClient;

// ============================================================================
// API wire types
// ============================================================================

/// A project document as returned by the docs endpoints
#[derive(Debug, Deserialize)]
struct DocResponse {
    uuid: String,
    file_name: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    file_name: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    uuid: String,
    name: String,
    #[serde(default)]
    archived_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateProjectRequest<'a> {
    name: &'a str,
    description: &'a str,
    is_private: bool,
}

impl DocResponse {
    fn into_entry(self) -> Result<RemoteFileEntry, RemoteError> {
        let path = RelativePath::new(self.file_name.as_str()).map_err(|e| {
            RemoteError::InvalidResponse(format!("document '{}': {e}", self.file_name))
        })?;
        let remote_id = RemoteId::new(self.uuid.as_str())
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(RemoteFileEntry::new(
            path,
            fingerprint::normalized(&self.content),
            remote_id,
        ))
    }
}

impl ProjectResponse {
    fn into_project(self) -> Result<RemoteProject, RemoteError> {
        let id = ProjectId::new(self.uuid.as_str())
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(RemoteProject {
            id,
            name: self.name,
            archived: self.archived_at.is_some(),
        })
    }
}

fn docs_path(scope: &Scope) -> String {
    format!(
        "/organizations/{}/projects/{}/docs",
        scope.organization, scope.project
    )
}

fn projects_path(organization: &OrganizationId) -> String {
    format!("/organizations/{organization}/projects")
}

// ============================================================================
// HttpRemoteStore
// ============================================================================

/// Remote Store backed by the project store HTTP API
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: ApiClient,
}

impl HttpRemoteStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl IRemoteStore for HttpRemoteStore {
    async fn list_files(&self, scope: &Scope) -> Result<Vec<RemoteFileEntry>, RemoteError> {
        debug!(scope = %scope, "Listing remote files");
        let docs: Vec<DocResponse> = self
            .client
            .send_json(self.client.request(Method::GET, &docs_path(scope)))
            .await?;
        let entries: Vec<RemoteFileEntry> = docs
            .into_iter()
            .filter_map(|doc| {
                let (uuid, file_name) = (doc.uuid.clone(), doc.file_name.clone());
                doc.into_entry()
                    .map_err(|e| {
                        warn!(uuid = %uuid, file_name = %file_name, error = %e, "Skipping unusable remote document");
                    })
                    .ok()
            })
            .collect();
        debug!(scope = %scope, count = entries.len(), "Listed remote files");
        Ok(entries)
    }

    async fn upload_file(
        &self,
        scope: &Scope,
        path: &RelativePath,
        content: &str,
    ) -> Result<RemoteFileEntry, RemoteError> {
        let body = UploadRequest {
            file_name: path.as_str(),
            content,
        };
        let doc: DocResponse = self
            .client
            .send_json(self.client.request(Method::POST, &docs_path(scope)).json(&body))
            .await?;
        let remote_id =
            RemoteId::new(doc.uuid.as_str()).map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        debug!(path = %path, remote_id = %remote_id, "Uploaded document");
        Ok(RemoteFileEntry::new(
            path.clone(),
            fingerprint::normalized(content),
            remote_id,
        ))
    }

    async fn delete_file(&self, scope: &Scope, remote_id: &RemoteId) -> Result<(), RemoteError> {
        let url = format!("{}/{}", docs_path(scope), remote_id);
        self.client
            .send_empty(self.client.request(Method::DELETE, &url))
            .await
    }

    async fn list_projects(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<RemoteProject>, RemoteError> {
        let projects: Vec<ProjectResponse> = self
            .client
            .send_json(self.client.request(Method::GET, &projects_path(organization)))
            .await?;
        projects
            .into_iter()
            .map(ProjectResponse::into_project)
            .collect()
    }

    async fn create_project(
        &self,
        organization: &OrganizationId,
        name: &str,
        description: &str,
    ) -> Result<RemoteProject, RemoteError> {
        let body = CreateProjectRequest {
            name,
            description,
            is_private: true,
        };
        let project: ProjectResponse = self
            .client
            .send_json(
                self.client
                    .request(Method::POST, &projects_path(organization))
                    .json(&body),
            )
            .await?;
        let project = project.into_project()?;
        info!(name = %project.name, id = %project.id, "Created remote project");
        Ok(project)
    }
}
