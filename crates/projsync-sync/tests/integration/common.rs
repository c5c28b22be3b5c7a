//! Shared test helpers for sync engine integration tests
//!
//! Provides an in-memory [`IRemoteStore`] with call recording and failure
//! injection, plus helpers for building local trees and scopes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use projsync_core::domain::newtypes::{OrganizationId, ProjectId, RelativePath, RemoteId};
use projsync_core::domain::records::{RemoteFileEntry, RemoteProject, Scope};
use projsync_core::fingerprint;
use projsync_core::ports::{IRemoteStore, RemoteError};
use projsync_sync::engine::EngineOptions;
use projsync_sync::inventory::InventoryOptions;
use projsync_sync::retry::{Backoff, RetryPolicy};
use projsync_sync::session::SessionRunner;

/// A recorded Remote Store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Upload(String, String),
    Delete(String, String),
    ListProjects,
    CreateProject(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Upload,
    Delete,
    ListProjects,
}

#[derive(Debug)]
struct Failure {
    op: Op,
    /// Scope for List, path for Upload, remote id for Delete
    key: String,
    error: RemoteError,
    remaining: Option<u32>,
}

#[derive(Debug, Clone)]
struct Doc {
    id: String,
    path: String,
    content: String,
}

#[derive(Debug, Default)]
struct State {
    docs: HashMap<String, Vec<Doc>>,
    projects: HashMap<String, Vec<RemoteProject>>,
    next_id: u64,
    failures: Vec<Failure>,
    calls: Vec<Call>,
}

impl State {
    fn take_failure(&mut self, op: Op, key: &str) -> Option<RemoteError> {
        let index = self
            .failures
            .iter()
            .position(|f| f.op == op && f.key == key && f.remaining != Some(0))?;
        let failure = &mut self.failures[index];
        if let Some(n) = failure.remaining.as_mut() {
            *n -= 1;
        }
        Some(failure.error.clone())
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("doc-{}", self.next_id)
    }
}

/// In-memory Remote Store keyed by scope
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    state: Mutex<State>,
}

impl MemoryRemoteStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a document directly, returning its remote id
    pub fn seed(&self, scope: &Scope, path: &str, content: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.docs.entry(scope.to_string()).or_default().push(Doc {
            id: id.clone(),
            path: path.to_string(),
            content: content.to_string(),
        });
        id
    }

    pub fn add_project(&self, org: &str, id: &str, name: &str, archived: bool) {
        self.state
            .lock()
            .unwrap()
            .projects
            .entry(org.to_string())
            .or_default()
            .push(RemoteProject {
                id: ProjectId::new(id).unwrap(),
                name: name.to_string(),
                archived,
            });
    }

    /// Fails `times` calls (or every call when `None`) of `op` on `key`
    pub fn fail(&self, op: Op, key: &str, error: RemoteError, times: Option<u32>) {
        self.state.lock().unwrap().failures.push(Failure {
            op,
            key: key.to_string(),
            error,
            remaining: times,
        });
    }

    /// Current documents of a scope as sorted (path, content, id) triples
    pub fn docs(&self, scope: &Scope) -> Vec<(String, String, String)> {
        let state = self.state.lock().unwrap();
        let mut docs: Vec<_> = state
            .docs
            .get(&scope.to_string())
            .map(|d| {
                d.iter()
                    .map(|doc| (doc.path.clone(), doc.content.clone(), doc.id.clone()))
                    .collect()
            })
            .unwrap_or_default();
        docs.sort();
        docs
    }

    pub fn paths(&self, scope: &Scope) -> Vec<String> {
        self.docs(scope).into_iter().map(|(p, _, _)| p).collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Mutating calls only
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Upload(..) | Call::Delete(..) | Call::CreateProject(_)))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl IRemoteStore for MemoryRemoteStore {
    async fn list_files(&self, scope: &Scope) -> Result<Vec<RemoteFileEntry>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let key = scope.to_string();
        state.calls.push(Call::List(key.clone()));
        if let Some(err) = state.take_failure(Op::List, &key) {
            return Err(err);
        }
        Ok(state
            .docs
            .get(&key)
            .map(|docs| {
                docs.iter()
                    .map(|d| {
                        RemoteFileEntry::new(
                            RelativePath::new(d.path.as_str()).unwrap(),
                            fingerprint::normalized(&d.content),
                            RemoteId::new(d.id.as_str()).unwrap(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upload_file(
        &self,
        scope: &Scope,
        path: &RelativePath,
        content: &str,
    ) -> Result<RemoteFileEntry, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::Upload(scope.to_string(), path.to_string()));
        if let Some(err) = state.take_failure(Op::Upload, path.as_str()) {
            return Err(err);
        }
        let id = state.next_id();
        state.docs.entry(scope.to_string()).or_default().push(Doc {
            id: id.clone(),
            path: path.to_string(),
            content: content.to_string(),
        });
        Ok(RemoteFileEntry::new(
            path.clone(),
            fingerprint::normalized(content),
            RemoteId::new(id).unwrap(),
        ))
    }

    async fn delete_file(&self, scope: &Scope, remote_id: &RemoteId) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::Delete(scope.to_string(), remote_id.to_string()));
        if let Some(err) = state.take_failure(Op::Delete, remote_id.as_str()) {
            return Err(err);
        }
        let docs = state.docs.entry(scope.to_string()).or_default();
        let before = docs.len();
        docs.retain(|d| d.id != remote_id.as_str());
        if docs.len() == before {
            return Err(RemoteError::NotFound(remote_id.to_string()));
        }
        Ok(())
    }

    async fn list_projects(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<RemoteProject>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListProjects);
        if let Some(err) = state.take_failure(Op::ListProjects, organization.as_str()) {
            return Err(err);
        }
        Ok(state
            .projects
            .get(organization.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn create_project(
        &self,
        organization: &OrganizationId,
        name: &str,
        _description: &str,
    ) -> Result<RemoteProject, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateProject(name.to_string()));
        let id = format!("proj-{}", state.next_id());
        let project = RemoteProject {
            id: ProjectId::new(id).unwrap(),
            name: name.to_string(),
            archived: false,
        };
        state
            .projects
            .entry(organization.to_string())
            .or_default()
            .push(project.clone());
        Ok(project)
    }
}

pub fn scope(org: &str, project: &str) -> Scope {
    Scope::new(
        OrganizationId::new(org).unwrap(),
        ProjectId::new(project).unwrap(),
    )
}

/// Writes files (creating parent directories) under `root`
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

/// Retry policy with millisecond delays for fast tests
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(
        3,
        Backoff::new(Duration::from_millis(1), Duration::from_millis(4)),
        Duration::from_secs(1),
    )
}

pub fn runner(store: Arc<MemoryRemoteStore>) -> SessionRunner {
    runner_with(store, EngineOptions::default())
}

pub fn runner_with(store: Arc<MemoryRemoteStore>, options: EngineOptions) -> SessionRunner {
    SessionRunner::new(store, fast_retry(), options, InventoryOptions::default())
}
