//! Submodule commands - Inspect nested project roots and create their
//! remote projects

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::json;
use tracing::info;

use projsync_core::config::Config;
use projsync_core::ports::IRemoteStore;
use projsync_sync::retry::RetryPolicy;
use projsync_sync::submodule::{discover_submodules, resolve_scope, SubmoduleRoot};

use super::{connect, CommandContext};
use crate::output::plural;

#[derive(Debug, Subcommand)]
pub enum SubmoduleCommand {
    /// List submodule roots found under the sync root
    Ls,
    /// Create remote projects for submodules that have none
    Create,
}

impl SubmoduleCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        match self {
            SubmoduleCommand::Ls => self.execute_ls(ctx).await,
            SubmoduleCommand::Create => self.execute_create(ctx).await,
        }
    }

    async fn execute_ls(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let config = ctx.valid_config()?;
        let submodules = discover(&config)?;
        let parent = config.remote.project_name.as_deref();

        if ctx.is_json() {
            let list: Vec<serde_json::Value> = submodules
                .iter()
                .map(|s| {
                    json!({
                        "root": s.relative.as_str(),
                        "marker": s.marker,
                        "project_name": parent.map(|p| s.project_name(p)),
                    })
                })
                .collect();
            formatter.print_json(&json!({ "submodules": list }));
            return Ok(ExitCode::SUCCESS);
        }

        formatter.success(&format!(
            "Found {}",
            plural(submodules.len() as u64, "submodule")
        ));
        for submodule in &submodules {
            match parent {
                Some(parent) => formatter.info(&format!(
                    "{} ({}) -> {}",
                    submodule.relative,
                    submodule.marker,
                    submodule.project_name(parent)
                )),
                None => formatter.info(&format!("{} ({})", submodule.relative, submodule.marker)),
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    async fn execute_create(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let config = ctx.valid_config()?;
        let parent = config
            .remote
            .project_name
            .clone()
            .context("remote.project_name must be set to name submodule projects")?;
        let organization = config.remote.scope()?.organization;
        let submodules = discover(&config)?;
        if submodules.is_empty() {
            formatter.success("No submodules found");
            return Ok(ExitCode::SUCCESS);
        }

        let store = connect(&config)?;
        let retry = RetryPolicy::from_config(&config.retry);
        let projects = match retry
            .run_remote("list_projects", || store.list_projects(&organization))
            .await
        {
            Ok(projects) => projects,
            Err(err) => {
                formatter.error(&format!("Failed to list projects: {err}"));
                return Ok(ExitCode::from(2));
            }
        };

        let mut results = Vec::new();
        let mut failed = false;
        for submodule in &submodules {
            let name = submodule.project_name(&parent);
            if resolve_scope(&organization, &parent, submodule, &projects).is_some() {
                formatter.info(&format!("{}: project '{name}' already exists", submodule.relative));
                results.push(json!({"root": submodule.relative.as_str(), "project_name": name, "status": "exists"}));
                continue;
            }

            match store
                .create_project(&organization, &name, &description(submodule, &parent))
                .await
            {
                Ok(project) => {
                    info!(name = %name, id = %project.id, "Created submodule project");
                    formatter.success(&format!("{}: created '{name}' ({})", submodule.relative, project.id));
                    results.push(json!({
                        "root": submodule.relative.as_str(),
                        "project_name": name,
                        "status": "created",
                        "project_id": project.id.as_str(),
                    }));
                }
                Err(err) => {
                    failed = true;
                    formatter.error(&format!("{}: could not create '{name}': {err}", submodule.relative));
                    results.push(json!({
                        "root": submodule.relative.as_str(),
                        "project_name": name,
                        "status": "failed",
                        "error": err.to_string(),
                    }));
                }
            }
        }

        formatter.print_json(&json!({ "submodules": results }));
        Ok(if failed { ExitCode::from(2) } else { ExitCode::SUCCESS })
    }
}

fn discover(config: &Config) -> Result<Vec<SubmoduleRoot>> {
    let root = config.sync.resolved_root();
    discover_submodules(&root, &config.sync.submodule_markers)
        .with_context(|| format!("Failed to scan {}", root.display()))
}

fn description(submodule: &SubmoduleRoot, parent: &str) -> String {
    format!(
        "Submodule '{}' of project '{}'",
        submodule.dir_name(),
        parent
    )
}
