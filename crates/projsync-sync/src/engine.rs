//! Reconciliation engine
//!
//! The [`ReconciliationEngine`] brings one remote scope into agreement with
//! a [`LocalInventory`].
//!
//! ## Plan
//!
//! [`ReconciliationPlan::compute`] indexes both sides by relative path:
//!
//! - **upload**: local paths absent remotely, or present with a different
//!   fingerprint (the stale entry is replaced)
//! - **delete**: remote paths absent locally
//! - **unchanged**: paths whose fingerprints match
//!
//! ## Execution Order
//!
//! 1. Uploads in path order. A replaced entry is deleted immediately before
//!    its upload; if that delete fails the upload is skipped so a path never
//!    carries two entries.
//! 2. Independent deletes, after every upload, so an interrupted run leaves
//!    extra content behind rather than missing content.
//!
//! Every Remote Store call goes through the engine's [`RetryPolicy`]. A
//! failure after retries is recorded against its file and the engine moves
//! on to the next one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use projsync_core::domain::newtypes::{Fingerprint, RelativePath, SessionId};
use projsync_core::domain::records::{LocalInventory, RemoteFileEntry, Scope};
use projsync_core::domain::report::{FileFailure, FileOperation, SyncReport};
use projsync_core::fingerprint;
use projsync_core::ports::{IRemoteStore, RemoteError};

use crate::retry::RetryPolicy;

// ============================================================================
// ReconciliationPlan
// ============================================================================

/// A file to upload, optionally replacing a stale remote entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub path: RelativePath,
    pub fingerprint: Fingerprint,
    /// Entry to delete right before the upload
    pub replaces: Option<RemoteFileEntry>,
}

/// Convergence plan for one scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub uploads: Vec<PlannedUpload>,
    pub deletes: Vec<RemoteFileEntry>,
    pub unchanged: Vec<RelativePath>,
}

impl ReconciliationPlan {
    /// Computes the plan that makes `remote` match `local`
    ///
    /// When the listing holds several entries at one path, the one matching
    /// the local fingerprint is kept (else the first listed is replaced) and
    /// the others are deleted.
    pub fn compute(local: &LocalInventory, remote: &[RemoteFileEntry]) -> Self {
        let mut by_path: BTreeMap<&RelativePath, Vec<&RemoteFileEntry>> = BTreeMap::new();
        for entry in remote {
            by_path.entry(&entry.path).or_default().push(entry);
        }

        let mut plan = Self::default();

        for record in local.records() {
            let Some(mut entries) = by_path.remove(&record.path) else {
                plan.uploads.push(PlannedUpload {
                    path: record.path.clone(),
                    fingerprint: record.fingerprint.clone(),
                    replaces: None,
                });
                continue;
            };

            match entries
                .iter()
                .position(|e| e.fingerprint == record.fingerprint)
            {
                Some(keep) => {
                    entries.remove(keep);
                    plan.unchanged.push(record.path.clone());
                }
                None => {
                    let stale = entries.remove(0);
                    plan.uploads.push(PlannedUpload {
                        path: record.path.clone(),
                        fingerprint: record.fingerprint.clone(),
                        replaces: Some(stale.clone()),
                    });
                }
            }
            plan.deletes.extend(entries.into_iter().cloned());
        }

        for (_, entries) in by_path {
            plan.deletes.extend(entries.into_iter().cloned());
        }
        plan.deletes.sort_by(|a, b| a.path.cmp(&b.path));

        plan
    }

    /// True when nothing needs to change remotely
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.deletes.is_empty()
    }

    /// Number of uploads that replace an existing entry
    pub fn replacements(&self) -> usize {
        self.uploads.iter().filter(|u| u.replaces.is_some()).count()
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Running counters, shareable with observers through an `Arc`
#[derive(Debug, Default)]
pub struct SyncProgress {
    examined: AtomicU64,
    uploaded: AtomicU64,
    deleted: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`SyncProgress`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub examined: u64,
    pub uploaded: u64,
    pub deleted: u64,
    pub failed: u64,
}

impl SyncProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            examined: self.examined.load(Ordering::Relaxed),
            uploaded: self.uploaded.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn add_examined(&self, n: u64) {
        self.examined.fetch_add(n, Ordering::Relaxed);
    }

    fn inc_uploaded(&self) {
        self.uploaded.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// ReconciliationEngine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Pause after each successful upload
    pub upload_delay: Duration,
}

/// Executes reconciliation plans against a Remote Store
pub struct ReconciliationEngine {
    store: Arc<dyn IRemoteStore>,
    retry: RetryPolicy,
    options: EngineOptions,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn IRemoteStore>, retry: RetryPolicy, options: EngineOptions) -> Self {
        Self {
            store,
            retry,
            options,
        }
    }

    /// Computes and executes the plan for one scope
    #[tracing::instrument(skip_all, fields(scope = %scope, session = %session_id))]
    pub async fn reconcile(
        &self,
        session_id: SessionId,
        scope: &Scope,
        inventory: &LocalInventory,
        remote: &[RemoteFileEntry],
        progress: &SyncProgress,
        cancel: &CancellationToken,
    ) -> SyncReport {
        let plan = ReconciliationPlan::compute(inventory, remote);
        info!(
            local = inventory.len(),
            remote = remote.len(),
            uploads = plan.uploads.len(),
            replacements = plan.replacements(),
            deletes = plan.deletes.len(),
            unchanged = plan.unchanged.len(),
            "Computed reconciliation plan"
        );
        self.execute(session_id, scope, inventory, plan, progress, cancel)
            .await
    }

    /// Executes a previously computed plan
    pub async fn execute(
        &self,
        session_id: SessionId,
        scope: &Scope,
        inventory: &LocalInventory,
        plan: ReconciliationPlan,
        progress: &SyncProgress,
        cancel: &CancellationToken,
    ) -> SyncReport {
        let start = Instant::now();
        let mut report = SyncReport::new(session_id, scope.clone());
        report.examined = inventory.len() as u64;
        report.unchanged = plan.unchanged.len() as u64;
        progress.add_examined(report.examined);

        for path in &plan.unchanged {
            debug!(path = %path, "Unchanged");
        }

        for upload in &plan.uploads {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            self.upload_one(scope, inventory, upload, &mut report, progress)
                .await;
        }

        if !report.cancelled {
            for entry in &plan.deletes {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                match self.delete(scope, entry).await {
                    Ok(()) => {
                        info!(path = %entry.path, remote_id = %entry.remote_id, "Deleted remote file");
                        report.deleted += 1;
                        progress.inc_deleted();
                    }
                    Err(err) => {
                        fail(&mut report, progress, &entry.path, FileOperation::Delete, &err);
                    }
                }
            }
        }

        if report.cancelled {
            warn!("Sync cancelled before all operations were started");
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            uploaded = report.uploaded,
            replaced = report.replaced,
            deleted = report.deleted,
            unchanged = report.unchanged,
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "Reconciliation finished"
        );
        report
    }

    /// Reads, optionally replaces, then uploads one file
    ///
    /// The content read here is what gets uploaded, even when it no longer
    /// matches the planned fingerprint. Once the stale entry is deleted the
    /// upload always runs.
    async fn upload_one(
        &self,
        scope: &Scope,
        inventory: &LocalInventory,
        upload: &PlannedUpload,
        report: &mut SyncReport,
        progress: &SyncProgress,
    ) {
        let path = &upload.path;
        let content = match tokio::fs::read_to_string(inventory.absolute_path(path)).await {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path, %err, "Could not read file for upload");
                report.record_failure(FileFailure {
                    path: path.clone(),
                    operation: FileOperation::Read,
                    error: err.to_string(),
                    transient: false,
                });
                progress.inc_failed();
                return;
            }
        };

        if fingerprint::normalized(&content) != upload.fingerprint {
            warn!(path = %path, "File changed since it was scanned; uploading current content");
            report.changed_during_sync += 1;
        }

        if let Some(stale) = &upload.replaces {
            match self.delete(scope, stale).await {
                Ok(()) => {
                    debug!(path = %path, remote_id = %stale.remote_id, "Deleted stale remote entry");
                    report.replaced += 1;
                }
                Err(err) => {
                    fail(report, progress, path, FileOperation::Replace, &err);
                    return;
                }
            }
        }

        let result = self
            .retry
            .run_remote("upload_file", || self.store.upload_file(scope, path, &content))
            .await;

        match result {
            Ok(entry) => {
                info!(path = %path, remote_id = %entry.remote_id, "Uploaded file");
                report.uploaded += 1;
                progress.inc_uploaded();
                if !self.options.upload_delay.is_zero() {
                    tokio::time::sleep(self.options.upload_delay).await;
                }
            }
            Err(err) => fail(report, progress, path, FileOperation::Upload, &err),
        }
    }

    async fn delete(&self, scope: &Scope, entry: &RemoteFileEntry) -> Result<(), RemoteError> {
        self.retry
            .run_remote("delete_file", || {
                self.store.delete_file(scope, &entry.remote_id)
            })
            .await
    }
}

fn fail(
    report: &mut SyncReport,
    progress: &SyncProgress,
    path: &RelativePath,
    operation: FileOperation,
    err: &RemoteError,
) {
    warn!(path = %path, %operation, error = %err, "File operation failed");
    report.record_failure(FileFailure {
        path: path.clone(),
        operation,
        error: err.to_string(),
        transient: err.is_transient(),
    });
    progress.inc_failed();
}
