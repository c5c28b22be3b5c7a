//! CLI subcommands and the context they share

pub mod completions;
pub mod config;
pub mod ls;
pub mod submodule;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use projsync_core::config::{Config, SESSION_KEY_ENV};
use projsync_remote::{ApiClient, HttpRemoteStore};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global options every command runs with
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Loads the config file, or the defaults when there is none
    ///
    /// A file that exists but cannot be parsed is an error.
    pub fn load_config(&self) -> Result<Config> {
        if !self.config_path.exists() {
            debug!(config_path = %self.config_path.display(), "No configuration file, using defaults");
            return Ok(Config::default());
        }
        let config = Config::load(&self.config_path).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })?;
        info!(config_path = %self.config_path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Loads the config and rejects it when validation finds any error
    pub fn valid_config(&self) -> Result<Config> {
        let config = self.load_config()?;
        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("Invalid configuration: {}", messages.join("; "));
        }
        Ok(config)
    }
}

/// Builds the HTTP Remote Store from the `remote` section
pub fn connect(config: &Config) -> Result<Arc<HttpRemoteStore>> {
    let session_key = config.remote.resolve_session_key().with_context(|| {
        format!("No session key configured; set {SESSION_KEY_ENV} or remote.session_key")
    })?;
    let client = ApiClient::new(
        config.remote.base_url.as_str(),
        session_key,
        Duration::from_secs(config.remote.request_timeout_secs),
    )
    .context("Failed to create HTTP client")?;
    Ok(Arc::new(HttpRemoteStore::new(client)))
}
