//! Sync command - Push the local tree into its remote projects
//!
//! Provides the `projsync sync` CLI command which:
//! 1. Loads and validates the configuration
//! 2. Creates the HTTP Remote Store and the session runner
//! 3. Runs the main session plus one session per resolvable submodule
//! 4. Prints one report per root, the skipped submodules and a total

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use projsync_core::config::Config;
use projsync_core::domain::report::SyncReport;
use projsync_sync::category::FileCategory;
use projsync_sync::engine::{EngineOptions, ReconciliationPlan, SyncProgress};
use projsync_sync::inventory::InventoryOptions;
use projsync_sync::retry::RetryPolicy;
use projsync_sync::session::{SessionRunner, TreeSummary, TreeSyncRequest};

use super::{connect, CommandContext};
use crate::output::{format_duration, plural, OutputFormatter};

/// Exit status for configuration errors
const EXIT_CONFIG: u8 = 1;
/// Exit status when any file, session or submodule did not sync
const EXIT_PARTIAL: u8 = 2;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Only sync files of this configured category
    #[arg(long, value_name = "NAME")]
    pub category: Option<String>,

    /// Sync the main root only
    #[arg(long)]
    pub no_submodules: bool,

    /// Stop starting new operations after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let config = ctx.valid_config()?;
        let request = self.request(&config)?;
        let runner = self.runner(&config)?;

        info!(
            root = %request.root.display(),
            scope = %request.scope,
            dry_run = self.dry_run,
            "Starting sync"
        );

        if self.dry_run {
            formatter.info("Dry run mode - no changes will be made");
            let summary = runner.plan_tree(&request).await;
            if ctx.is_json() {
                formatter.print_json(&plans_json(&summary));
            } else {
                print_plans(formatter.as_ref(), &summary);
            }
            return Ok(ExitCode::from(exit_status(&summary, |_| true)));
        }

        let cancel = CancellationToken::new();
        spawn_cancel_triggers(&cancel, self.timeout);

        let summary = runner
            .sync_tree(&request, Arc::new(SyncProgress::new()), cancel.clone())
            .await;
        cancel.cancel();

        if ctx.is_json() {
            formatter.print_json(&summary_json(&summary));
        } else {
            print_summary(formatter.as_ref(), &summary);
        }
        Ok(ExitCode::from(exit_status(&summary, SyncReport::is_success)))
    }

    fn request(&self, config: &Config) -> Result<TreeSyncRequest> {
        Ok(TreeSyncRequest {
            root: config.sync.resolved_root(),
            scope: config.remote.scope()?,
            project_name: config.remote.project_name.clone(),
            submodule_markers: config.sync.submodule_markers.clone(),
            include_submodules: config.sync.include_submodules,
            sync_submodules: !self.no_submodules,
            max_concurrent_sessions: config.sync.max_concurrent_sessions,
        })
    }

    fn runner(&self, config: &Config) -> Result<SessionRunner> {
        let mut inventory = InventoryOptions::default().with_max_file_size(config.sync.max_file_size);
        if let Some(name) = &self.category {
            inventory = inventory.with_category(FileCategory::resolve(&config.categories, name)?);
        }
        let engine = EngineOptions {
            upload_delay: Duration::from_millis(config.sync.upload_delay_ms),
        };
        Ok(SessionRunner::new(
            connect(config)?,
            RetryPolicy::from_config(&config.retry),
            engine,
            inventory,
        ))
    }
}

/// Cancels `cancel` on Ctrl-C or when the timeout elapses
fn spawn_cancel_triggers(cancel: &CancellationToken, timeout: Option<u64>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    warn!("Interrupted, finishing operations in flight");
                    token.cancel();
                }
            }
        }
    });

    if let Some(secs) = timeout {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    warn!(timeout_secs = secs, "Timeout reached, cancelling sync");
                    token.cancel();
                }
            }
        });
    }
}

/// 0 when everything synced, 1 for configuration errors, 2 otherwise
fn exit_status<T>(summary: &TreeSummary<T>, succeeded: impl Fn(&T) -> bool) -> u8 {
    if let Err(err) = &summary.main.result {
        if err.is_config() {
            return EXIT_CONFIG;
        }
    }
    let all_ok = summary.skipped.is_empty()
        && summary
            .sessions()
            .all(|s| s.result.as_ref().is_ok_and(&succeeded));
    if all_ok {
        0
    } else {
        EXIT_PARTIAL
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Default, PartialEq, Eq)]
struct Totals {
    unchanged: u64,
    uploaded: u64,
    replaced: u64,
    deleted: u64,
    failed: u64,
    failed_sessions: u64,
}

impl Totals {
    fn of(summary: &TreeSummary<SyncReport>) -> Self {
        let mut totals = Totals::default();
        for session in summary.sessions() {
            match &session.result {
                Ok(report) => {
                    totals.unchanged += report.unchanged;
                    totals.uploaded += report.uploaded;
                    totals.replaced += report.replaced;
                    totals.deleted += report.deleted;
                    totals.failed += report.failed();
                }
                Err(_) => totals.failed_sessions += 1,
            }
        }
        totals
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "unchanged": self.unchanged,
            "uploaded": self.uploaded,
            "replaced": self.replaced,
            "deleted": self.deleted,
            "failed": self.failed,
            "failed_sessions": self.failed_sessions,
        })
    }
}

fn skipped_json<T>(summary: &TreeSummary<T>) -> Vec<serde_json::Value> {
    summary
        .skipped
        .iter()
        .map(|s| {
            json!({
                "root": s.root.relative.as_str(),
                "marker": s.root.marker,
                "reason": s.reason,
            })
        })
        .collect()
}

fn summary_json(summary: &TreeSummary<SyncReport>) -> serde_json::Value {
    let sessions: Vec<serde_json::Value> = summary
        .sessions()
        .map(|s| match &s.result {
            Ok(report) => json!({
                "root": s.label(),
                "scope": s.scope.to_string(),
                "report": report,
            }),
            Err(err) => json!({
                "root": s.label(),
                "scope": s.scope.to_string(),
                "error": err.to_string(),
            }),
        })
        .collect();

    json!({
        "success": summary.is_success(),
        "sessions": sessions,
        "skipped": skipped_json(summary),
        "total": Totals::of(summary).to_json(),
    })
}

fn print_summary(formatter: &dyn OutputFormatter, summary: &TreeSummary<SyncReport>) {
    for session in summary.sessions() {
        let heading = format!("{} ({})", session.label(), session.scope);
        let report = match &session.result {
            Ok(report) => report,
            Err(err) => {
                formatter.error(&format!("{heading}: {err}"));
                continue;
            }
        };

        let line = format!(
            "{heading}: {} uploaded ({} replaced), {} deleted, {} unchanged in {}",
            report.uploaded,
            report.replaced,
            report.deleted,
            report.unchanged,
            format_duration(report.duration_ms)
        );
        if report.is_success() {
            formatter.success(&line);
        } else {
            formatter.warn(&line);
        }
        if report.cancelled {
            formatter.warn(&format!("{heading}: cancelled before all operations started"));
        }
        if report.changed_during_sync > 0 {
            formatter.warn(&format!(
                "{heading}: {} changed while syncing; current content was uploaded",
                plural(report.changed_during_sync, "file")
            ));
        }
        if !report.failures.is_empty() {
            formatter.error(&format!(
                "{}: {} failed:",
                heading,
                plural(report.failed(), "file")
            ));
            for failure in &report.failures {
                formatter.info(&format!("  - {failure}"));
            }
        }
    }

    for skipped in &summary.skipped {
        formatter.warn(&format!(
            "Skipped submodule {}: {}",
            skipped.root.relative, skipped.reason
        ));
    }

    let totals = Totals::of(summary);
    let sessions = summary.sessions().count() as u64;
    formatter.info(&format!(
        "Total: {} uploaded, {} deleted, {} unchanged, {} failed across {}",
        totals.uploaded,
        totals.deleted,
        totals.unchanged,
        totals.failed,
        plural(sessions, "session")
    ));
}

// ============================================================================
// Plans
// ============================================================================

fn plans_json(summary: &TreeSummary<ReconciliationPlan>) -> serde_json::Value {
    let sessions: Vec<serde_json::Value> = summary
        .sessions()
        .map(|s| match &s.result {
            Ok(plan) => {
                let uploads: Vec<serde_json::Value> = plan
                    .uploads
                    .iter()
                    .map(|u| {
                        json!({
                            "path": u.path.as_str(),
                            "replaces": u.replaces.as_ref().map(|r| r.remote_id.as_str()),
                        })
                    })
                    .collect();
                let deletes: Vec<serde_json::Value> = plan
                    .deletes
                    .iter()
                    .map(|d| json!({"path": d.path.as_str(), "remote_id": d.remote_id.as_str()}))
                    .collect();
                json!({
                    "root": s.label(),
                    "scope": s.scope.to_string(),
                    "uploads": uploads,
                    "deletes": deletes,
                    "unchanged": plan.unchanged.len(),
                })
            }
            Err(err) => json!({
                "root": s.label(),
                "scope": s.scope.to_string(),
                "error": err.to_string(),
            }),
        })
        .collect();

    json!({
        "dry_run": true,
        "sessions": sessions,
        "skipped": skipped_json(summary),
    })
}

fn print_plans(formatter: &dyn OutputFormatter, summary: &TreeSummary<ReconciliationPlan>) {
    for session in summary.sessions() {
        let heading = format!("{} ({})", session.label(), session.scope);
        let plan = match &session.result {
            Ok(plan) => plan,
            Err(err) => {
                formatter.error(&format!("{heading}: {err}"));
                continue;
            }
        };

        if plan.is_empty() {
            formatter.success(&format!(
                "{heading}: up to date ({} unchanged)",
                plan.unchanged.len()
            ));
            continue;
        }
        formatter.success(&format!(
            "{heading}: {} to upload ({} replacing), {} to delete, {} unchanged",
            plan.uploads.len(),
            plan.replacements(),
            plan.deletes.len(),
            plan.unchanged.len()
        ));
        for upload in &plan.uploads {
            let marker = if upload.replaces.is_some() { "~" } else { "+" };
            formatter.info(&format!("{marker} {}", upload.path));
        }
        for delete in &plan.deletes {
            formatter.info(&format!("- {}", delete.path));
        }
    }

    for skipped in &summary.skipped {
        formatter.warn(&format!(
            "Would skip submodule {}: {}",
            skipped.root.relative, skipped.reason
        ));
    }
}
