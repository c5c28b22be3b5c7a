//! Ls command - List the files of the configured remote project

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use projsync_core::domain::records::RemoteFileEntry;
use projsync_core::ports::IRemoteStore;
use projsync_sync::retry::RetryPolicy;

use super::{connect, CommandContext};
use crate::output::plural;

#[derive(Debug, Args)]
pub struct LsCommand {}

impl LsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let scope = config.remote.scope()?;
        let store = connect(&config)?;
        let retry = RetryPolicy::from_config(&config.retry);

        let mut files = match retry
            .run_remote("list_files", || store.list_files(&scope))
            .await
        {
            Ok(files) => files,
            Err(err) => {
                formatter.error(&format!("Failed to list {scope}: {err}"));
                return Ok(ExitCode::from(2));
            }
        };
        files.sort_by(|a, b| a.path.cmp(&b.path));

        if ctx.is_json() {
            formatter.print_json(&files_json(&scope.to_string(), &files));
            return Ok(ExitCode::SUCCESS);
        }

        formatter.success(&format!(
            "{} in {}",
            plural(files.len() as u64, "remote file"),
            scope
        ));
        for file in &files {
            formatter.info(&format!(
                "{}  {}  {}",
                file.fingerprint.short(),
                file.remote_id,
                file.path
            ));
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn files_json(scope: &str, files: &[RemoteFileEntry]) -> serde_json::Value {
    let files: Vec<serde_json::Value> = files
        .iter()
        .map(|f| {
            json!({
                "path": f.path.as_str(),
                "remote_id": f.remote_id.as_str(),
                "fingerprint": f.fingerprint.as_str(),
            })
        })
        .collect();
    json!({"scope": scope, "files": files})
}
