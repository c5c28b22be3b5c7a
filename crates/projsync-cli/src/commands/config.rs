//! Config command - View and check the projsync configuration
//!
//! Provides the `projsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports every error
//! 3. Prints the path of the configuration file in use

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use projsync_core::config::Config;

use super::CommandContext;

/// Placeholder shown instead of a configured session key
const REDACTED: &str = "<redacted>";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<ExitCode> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Path => {
                if ctx.is_json() {
                    ctx.formatter().print_json(&serde_json::json!({
                        "config_path": ctx.config_path.display().to_string(),
                        "exists": ctx.config_path.exists(),
                    }));
                } else {
                    println!("{}", ctx.config_path.display());
                }
                Ok(ExitCode::SUCCESS)
            }
        }
    }

    fn execute_show(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let config = redacted(ctx.load_config()?);

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;

            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    fn execute_validate(&self, ctx: &CommandContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let config_path = &ctx.config_path;

        let config = if config_path.exists() {
            match Config::load(config_path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    if ctx.is_json() {
                        formatter.print_json(&serde_json::json!({
                            "valid": false,
                            "config_path": config_path.display().to_string(),
                            "errors": [format!("Failed to parse configuration: {}", e)],
                        }));
                    } else {
                        formatter.error(&format!("Failed to parse configuration: {}", e));
                        formatter.info(&format!("File: {}", config_path.display()));
                    }
                    return Ok(ExitCode::from(1));
                }
            }
        } else {
            formatter.info(&format!(
                "Configuration file not found at {}; checking defaults",
                config_path.display()
            ));
            Config::default()
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let mut errors: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
        if let Err(e) = config.remote.scope() {
            errors.push(e.to_string());
        }
        if config.remote.resolve_session_key().is_none() {
            errors.push(format!(
                "remote.session_key: not set (or set {})",
                projsync_core::config::SESSION_KEY_ENV
            ));
        }

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": errors,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            for err in &errors {
                formatter.info(&format!("  - {}", err));
            }
        }

        Ok(if errors.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        })
    }
}

/// Hides the session key before the config is printed
fn redacted(mut config: Config) -> Config {
    if config.remote.session_key.is_some() {
        config.remote.session_key = Some(REDACTED.to_string());
    }
    config
}
