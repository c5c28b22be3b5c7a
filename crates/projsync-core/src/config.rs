//! Configuration module for projsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Components never read this globally; the binary converts it into explicit
//! option values for each session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{OrganizationId, ProjectId};
use crate::domain::records::Scope;

/// Environment variable that overrides `remote.session_key`.
pub const SESSION_KEY_ENV: &str = "PROJSYNC_SESSION_KEY";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for projsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub retry: RetryConfig,
    /// Named file categories selectable with `--category`.
    pub categories: BTreeMap<String, CategoryConfig>,
    pub logging: LoggingConfig,
}

/// Remote Store connection and scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the Remote Store API.
    pub base_url: String,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    /// Name of the active project; submodule projects are named after it.
    pub project_name: Option<String>,
    /// Session credential. Prefer the `PROJSYNC_SESSION_KEY` variable.
    pub session_key: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Local tree and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Root of the local tree to sync. A leading `~` is expanded at runtime.
    pub root: PathBuf,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
    /// Pause after each upload, in milliseconds.
    pub upload_delay_ms: u64,
    /// Keep files of submodule roots in the main session as well.
    pub include_submodules: bool,
    /// Filenames that mark a directory as a submodule root.
    pub submodule_markers: Vec<String>,
    /// How many sessions (main + submodules) may run at once.
    pub max_concurrent_sessions: usize,
}

/// Retry policy for Remote Store calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Longest rate-limit reset the client is willing to wait for.
    pub max_rate_limit_wait_secs: u64,
}

/// A named set of glob patterns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub description: String,
    pub patterns: Vec<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/projsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("projsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Markers of independently built sub-projects.
pub const DEFAULT_SUBMODULE_MARKERS: &[&str] = &[
    "pom.xml",
    "build.gradle",
    "package.json",
    "Cargo.toml",
    "go.mod",
    "setup.py",
    "pyproject.toml",
];

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://claude.ai/api".to_string(),
            organization_id: None,
            project_id: None,
            project_name: None,
            session_key: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_file_size: 32 * 1024,
            upload_delay_ms: 0,
            include_submodules: false,
            submodule_markers: DEFAULT_SUBMODULE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            max_concurrent_sessions: 1,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 16_000,
            max_rate_limit_wait_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

impl RemoteConfig {
    /// The scope addressed by `organization_id` and `project_id`.
    pub fn scope(&self) -> Result<Scope, ValidationError> {
        let org = self
            .organization_id
            .as_deref()
            .ok_or_else(|| ValidationError::new("remote.organization_id", "no organization selected"))?;
        let project = self
            .project_id
            .as_deref()
            .ok_or_else(|| ValidationError::new("remote.project_id", "no project selected"))?;

        let organization = OrganizationId::new(org)
            .map_err(|e| ValidationError::new("remote.organization_id", e.to_string()))?;
        let project = ProjectId::new(project)
            .map_err(|e| ValidationError::new("remote.project_id", e.to_string()))?;
        Ok(Scope::new(organization, project))
    }

    /// Session key from the environment, falling back to the file.
    pub fn resolve_session_key(&self) -> Option<String> {
        std::env::var(SESSION_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.session_key.clone())
    }
}

impl SyncConfig {
    /// `root` with a leading `~` replaced by the home directory.
    pub fn resolved_root(&self) -> PathBuf {
        match self.root.strip_prefix("~") {
            Ok(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| self.root.clone()),
            Err(_) => self.root.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.max_file_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. A missing scope is
    /// not reported here; commands that need one call [`RemoteConfig::scope`].
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        if !self.remote.base_url.starts_with("http://") && !self.remote.base_url.starts_with("https://") {
            errors.push(ValidationError::new(
                "remote.base_url",
                format!("must be an http(s) URL: {}", self.remote.base_url),
            ));
        }
        if self.remote.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "remote.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if let Some(org) = &self.remote.organization_id {
            if let Err(e) = OrganizationId::new(org.as_str()) {
                errors.push(ValidationError::new("remote.organization_id", e.to_string()));
            }
        }
        if let Some(project) = &self.remote.project_id {
            if let Err(e) = ProjectId::new(project.as_str()) {
                errors.push(ValidationError::new("remote.project_id", e.to_string()));
            }
        }

        // --- sync ---
        if self.sync.max_file_size == 0 {
            errors.push(ValidationError::new("sync.max_file_size", "must be greater than 0"));
        }
        if self.sync.max_concurrent_sessions == 0 {
            errors.push(ValidationError::new(
                "sync.max_concurrent_sessions",
                "must be greater than 0",
            ));
        }
        for marker in &self.sync.submodule_markers {
            if marker.is_empty() || marker.contains('/') {
                errors.push(ValidationError::new(
                    "sync.submodule_markers",
                    format!("marker must be a plain file name: '{marker}'"),
                ));
            }
        }

        let root = self.sync.resolved_root();
        if !root.is_dir() {
            errors.push(ValidationError::new(
                "sync.root",
                format!("directory does not exist: {}", root.display()),
            ));
        }

        // --- retry ---
        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::new("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.base_delay_ms == 0 {
            errors.push(ValidationError::new("retry.base_delay_ms", "must be greater than 0"));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            errors.push(ValidationError::new(
                "retry.max_delay_ms",
                format!(
                    "max_delay_ms ({}) must not be below base_delay_ms ({})",
                    self.retry.max_delay_ms, self.retry.base_delay_ms
                ),
            ));
        }

        // --- categories ---
        for (name, category) in &self.categories {
            if category.patterns.is_empty() {
                errors.push(ValidationError::new(
                    format!("categories.{name}.patterns"),
                    "must list at least one pattern",
                ));
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use projsync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_root(PathBuf::from("/home/user/project"))
///     .remote_scope("org-1", "proj-1")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_scope(mut self, organization: impl Into<String>, project: impl Into<String>) -> Self {
        self.config.remote.organization_id = Some(organization.into());
        self.config.remote.project_id = Some(project.into());
        self
    }

    pub fn remote_project_name(mut self, name: impl Into<String>) -> Self {
        self.config.remote.project_name = Some(name.into());
        self
    }

    pub fn remote_session_key(mut self, key: impl Into<String>) -> Self {
        self.config.remote.session_key = Some(key.into());
        self
    }

    pub fn remote_request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote.request_timeout_secs = secs;
        self
    }

    // --- sync ---

    pub fn sync_root(mut self, root: PathBuf) -> Self {
        self.config.sync.root = root;
        self
    }

    pub fn sync_max_file_size(mut self, bytes: u64) -> Self {
        self.config.sync.max_file_size = bytes;
        self
    }

    pub fn sync_upload_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.upload_delay_ms = ms;
        self
    }

    pub fn sync_include_submodules(mut self, include: bool) -> Self {
        self.config.sync.include_submodules = include;
        self
    }

    pub fn sync_submodule_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.submodule_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn sync_max_concurrent_sessions(mut self, n: usize) -> Self {
        self.config.sync.max_concurrent_sessions = n;
        self
    }

    // --- retry ---

    pub fn retry_max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_delays_ms(mut self, base: u64, max: u64) -> Self {
        self.config.retry.base_delay_ms = base;
        self.config.retry.max_delay_ms = max;
        self
    }

    pub fn retry_max_rate_limit_wait_secs(mut self, secs: u64) -> Self {
        self.config.retry.max_rate_limit_wait_secs = secs;
        self
    }

    // --- categories ---

    pub fn category<I, S>(mut self, name: impl Into<String>, description: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.categories.insert(
            name.into(),
            CategoryConfig {
                description: description.into(),
                patterns: patterns.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
