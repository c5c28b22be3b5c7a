//! Session runner
//!
//! A [`SessionRunner`] drives one [`SyncSession`] per root: build the local
//! inventory, list the remote scope, reconcile. [`SessionRunner::sync_tree`]
//! composes the main root with every discovered submodule root, each as an
//! independent session against its own scope. Sessions share no mutable
//! state, so up to `max_concurrent_sessions` of them run at once; the
//! failure of one never stops the others.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use projsync_core::domain::newtypes::RelativePath;
use projsync_core::domain::records::{LocalInventory, RemoteFileEntry, Scope};
use projsync_core::domain::report::SyncReport;
use projsync_core::domain::session::SyncSession;
use projsync_core::ports::IRemoteStore;

use crate::engine::{EngineOptions, ReconciliationEngine, ReconciliationPlan, SyncProgress};
use crate::inventory::{build_inventory, InventoryOptions};
use crate::retry::RetryPolicy;
use crate::submodule::{discover_submodules, nested_within, resolve_scope, SubmoduleRoot};
use crate::SyncError;

// ============================================================================
// Tree-level types
// ============================================================================

/// What to sync: the main root and how to treat its submodules
#[derive(Debug, Clone)]
pub struct TreeSyncRequest {
    pub root: PathBuf,
    pub scope: Scope,
    /// Name of the main project; submodule projects are named after it
    pub project_name: Option<String>,
    pub submodule_markers: Vec<String>,
    /// Keep submodule files in the main session too
    pub include_submodules: bool,
    /// Run a session for every resolvable submodule
    pub sync_submodules: bool,
    pub max_concurrent_sessions: usize,
}

/// A submodule that was not synced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSubmodule {
    pub root: SubmoduleRoot,
    pub reason: String,
}

/// Outcome of one session in a tree sync
#[derive(Debug)]
pub struct SessionOutcome<T> {
    pub root: PathBuf,
    /// Location relative to the main root; `None` for the main root
    pub relative: Option<RelativePath>,
    pub scope: Scope,
    pub result: Result<T, SyncError>,
}

impl<T> SessionOutcome<T> {
    /// Label for output: the relative path, or `.` for the main root
    pub fn label(&self) -> &str {
        self.relative.as_ref().map_or(".", RelativePath::as_str)
    }
}

/// Outcomes of the main session and every submodule session
#[derive(Debug)]
pub struct TreeSummary<T> {
    pub main: SessionOutcome<T>,
    pub submodules: Vec<SessionOutcome<T>>,
    pub skipped: Vec<SkippedSubmodule>,
}

impl<T> TreeSummary<T> {
    /// All sessions, main first
    pub fn sessions(&self) -> impl Iterator<Item = &SessionOutcome<T>> {
        std::iter::once(&self.main).chain(self.submodules.iter())
    }
}

impl TreeSummary<SyncReport> {
    /// True when every session completed without per-file failures and
    /// no submodule was skipped
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty()
            && self
                .sessions()
                .all(|s| s.result.as_ref().is_ok_and(SyncReport::is_success))
    }
}

/// One session to run within a tree
#[derive(Debug, Clone)]
struct SessionJob {
    root: PathBuf,
    relative: Option<RelativePath>,
    scope: Scope,
    excluded_roots: Vec<RelativePath>,
}

// ============================================================================
// SessionRunner
// ============================================================================

/// Runs sync sessions against a Remote Store
pub struct SessionRunner {
    store: Arc<dyn IRemoteStore>,
    retry: RetryPolicy,
    engine: ReconciliationEngine,
    inventory: InventoryOptions,
}

impl SessionRunner {
    pub fn new(
        store: Arc<dyn IRemoteStore>,
        retry: RetryPolicy,
        engine_options: EngineOptions,
        inventory: InventoryOptions,
    ) -> Self {
        let engine = ReconciliationEngine::new(Arc::clone(&store), retry.clone(), engine_options);
        Self {
            store,
            retry,
            engine,
            inventory,
        }
    }

    /// Builds the inventory of `root` on a blocking thread
    async fn scan(&self, root: &Path, excluded_roots: Vec<RelativePath>) -> Result<LocalInventory, SyncError> {
        let options = self.inventory.clone().with_excluded_roots(excluded_roots);
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || build_inventory(&root, &options))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<RemoteFileEntry>, SyncError> {
        self.retry
            .run_remote("list_files", || self.store.list_files(scope))
            .await
            .map_err(|source| SyncError::Listing {
                scope: scope.clone(),
                source,
            })
    }

    /// Runs one complete session for `root` against `scope`
    #[tracing::instrument(skip_all, fields(scope = %scope, root = %root.display()))]
    pub async fn run(
        &self,
        scope: &Scope,
        root: &Path,
        excluded_roots: Vec<RelativePath>,
        progress: &SyncProgress,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let mut session = SyncSession::new(scope.clone(), root);
        info!(session = %session.id(), "Starting sync session");

        if let Err(err) = self.prepare(&mut session, excluded_roots).await {
            error!(error = %err, "Sync session failed");
            session.fail(err.to_string());
            return Err(err);
        }

        let Some(inventory) = session.inventory() else {
            return Err(SyncError::Task("session has no inventory".to_string()));
        };
        let report = self
            .engine
            .reconcile(session.id(), scope, inventory, session.remote(), progress, cancel)
            .await;

        session.complete(&report)?;
        info!(
            session = %session.id(),
            status = %session.status(),
            "Sync session finished"
        );
        Ok(report)
    }

    /// Computes the plan for `root` without changing the remote
    pub async fn plan(
        &self,
        scope: &Scope,
        root: &Path,
        excluded_roots: Vec<RelativePath>,
    ) -> Result<ReconciliationPlan, SyncError> {
        let inventory = self.scan(root, excluded_roots).await?;
        let remote = self.list(scope).await?;
        Ok(ReconciliationPlan::compute(&inventory, &remote))
    }

    async fn prepare(&self, session: &mut SyncSession, excluded_roots: Vec<RelativePath>) -> Result<(), SyncError> {
        let inventory = self.scan(session.root(), excluded_roots).await?;
        session.set_inventory(inventory)?;
        let remote = self.list(session.scope()).await?;
        session.set_remote(remote)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Tree sync
    // ------------------------------------------------------------------------

    /// Syncs the main root and every resolvable submodule root
    pub async fn sync_tree(
        &self,
        request: &TreeSyncRequest,
        progress: Arc<SyncProgress>,
        cancel: CancellationToken,
    ) -> TreeSummary<SyncReport> {
        let (jobs, skipped) = self.resolve_jobs(request).await;
        let concurrency = request.max_concurrent_sessions.max(1);

        let mut outcomes: Vec<SessionOutcome<SyncReport>> = stream::iter(jobs)
            .map(|job| {
                let progress = Arc::clone(&progress);
                let cancel = cancel.clone();
                async move {
                    let result = self
                        .run(&job.scope, &job.root, job.excluded_roots, &progress, &cancel)
                        .await;
                    SessionOutcome {
                        root: job.root,
                        relative: job.relative,
                        scope: job.scope,
                        result,
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let main = outcomes.remove(0);
        TreeSummary {
            main,
            submodules: outcomes,
            skipped,
        }
    }

    /// Computes plans for the main root and every resolvable submodule root
    pub async fn plan_tree(&self, request: &TreeSyncRequest) -> TreeSummary<ReconciliationPlan> {
        let (jobs, skipped) = self.resolve_jobs(request).await;

        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let result = self.plan(&job.scope, &job.root, job.excluded_roots).await;
            outcomes.push(SessionOutcome {
                root: job.root,
                relative: job.relative,
                scope: job.scope,
                result,
            });
        }

        let main = outcomes.remove(0);
        TreeSummary {
            main,
            submodules: outcomes,
            skipped,
        }
    }

    /// Main job first, then one job per resolvable submodule
    ///
    /// Only submodules that get a session of their own are left out of the
    /// main session; a skipped submodule stays in the main scope.
    async fn resolve_jobs(&self, request: &TreeSyncRequest) -> (Vec<SessionJob>, Vec<SkippedSubmodule>) {
        let (synced, skipped) = if request.sync_submodules {
            self.resolve_submodules(request).await
        } else {
            (Vec::new(), Vec::new())
        };

        let synced_roots: Vec<SubmoduleRoot> = synced.iter().map(|(root, _)| root.clone()).collect();
        let excluded = |parent: Option<&RelativePath>| {
            if request.include_submodules {
                Vec::new()
            } else {
                nested_within(parent, &synced_roots)
            }
        };

        let mut jobs = vec![SessionJob {
            root: request.root.clone(),
            relative: None,
            scope: request.scope.clone(),
            excluded_roots: excluded(None),
        }];
        for (submodule, scope) in &synced {
            jobs.push(SessionJob {
                root: submodule.path.clone(),
                relative: Some(submodule.relative.clone()),
                scope: scope.clone(),
                excluded_roots: excluded(Some(&submodule.relative)),
            });
        }

        (jobs, skipped)
    }

    /// Discovers submodule roots and pairs each with its remote scope
    async fn resolve_submodules(
        &self,
        request: &TreeSyncRequest,
    ) -> (Vec<(SubmoduleRoot, Scope)>, Vec<SkippedSubmodule>) {
        if request.submodule_markers.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let root = request.root.clone();
        let markers = request.submodule_markers.clone();
        let submodules = match tokio::task::spawn_blocking(move || discover_submodules(&root, &markers)).await {
            Ok(Ok(found)) => found,
            Ok(Err(err)) => {
                // The main session reports the same root error
                warn!(error = %err, "Submodule discovery failed");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "Submodule discovery task failed");
                Vec::new()
            }
        };
        if submodules.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let skip_all = |reason: String| {
            submodules
                .iter()
                .map(|root| SkippedSubmodule {
                    root: root.clone(),
                    reason: reason.clone(),
                })
                .collect::<Vec<_>>()
        };

        let Some(parent_name) = request.project_name.as_deref() else {
            return (Vec::new(), skip_all("no active project name configured".to_string()));
        };

        let organization = &request.scope.organization;
        let projects = match self
            .retry
            .run_remote("list_projects", || self.store.list_projects(organization))
            .await
        {
            Ok(projects) => projects,
            Err(err) => {
                warn!(error = %err, "Could not list projects for submodule resolution");
                return (Vec::new(), skip_all(format!("project listing failed: {err}")));
            }
        };

        let mut synced = Vec::new();
        let mut skipped = Vec::new();
        let mut claimed: Vec<Scope> = vec![request.scope.clone()];
        for submodule in &submodules {
            let Some(scope) = resolve_scope(organization, parent_name, submodule, &projects) else {
                warn!(path = %submodule.relative, "No remote project for submodule");
                skipped.push(SkippedSubmodule {
                    root: submodule.clone(),
                    reason: format!(
                        "no remote project named '{}'",
                        submodule.project_name(parent_name)
                    ),
                });
                continue;
            };

            if claimed.contains(&scope) {
                skipped.push(SkippedSubmodule {
                    root: submodule.clone(),
                    reason: format!("scope {scope} is already synced by another root"),
                });
                continue;
            }
            claimed.push(scope.clone());
            synced.push((submodule.clone(), scope));
        }

        (synced, skipped)
    }
}
