//! File categories
//!
//! A category restricts an inventory to the files matching at least one of
//! its patterns. Patterns use the same syntax as ignore files.

use std::collections::BTreeMap;

use projsync_core::config::CategoryConfig;
use projsync_core::domain::newtypes::RelativePath;

use crate::ignore::PatternList;
use crate::SyncError;

#[derive(Debug, Clone)]
pub struct FileCategory {
    name: String,
    patterns: PatternList,
}

impl FileCategory {
    /// Compiles a category from its configuration
    ///
    /// # Errors
    /// Returns `SyncError::Config` if any pattern is not a valid glob
    pub fn from_config(name: &str, config: &CategoryConfig) -> Result<Self, SyncError> {
        let patterns = PatternList::from_patterns(&config.patterns).map_err(|e| {
            SyncError::Config(format!("category '{name}' has an invalid pattern: {e}"))
        })?;
        Ok(Self {
            name: name.to_string(),
            patterns,
        })
    }

    /// Looks up and compiles a category by name
    ///
    /// # Errors
    /// Returns `SyncError::Config` for an unknown name or an invalid pattern
    pub fn resolve(
        categories: &BTreeMap<String, CategoryConfig>,
        name: &str,
    ) -> Result<Self, SyncError> {
        let config = categories.get(name).ok_or_else(|| {
            let known: Vec<&str> = categories.keys().map(String::as_str).collect();
            SyncError::Config(format!(
                "unknown category '{name}'; known categories: {}",
                if known.is_empty() {
                    "(none)".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })?;
        Self::from_config(name, config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the file belongs to this category
    pub fn includes(&self, path: &RelativePath) -> bool {
        self.patterns.matches(path, false)
    }
}
