//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// Session identifier
// ============================================================================

/// Identifier for a single sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random SessionId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid UUID: {e}")))
    }
}

// ============================================================================
// Path types
// ============================================================================

/// A root-relative path in forward-slash notation
///
/// RelativePath ensures the path is:
/// - Non-empty and relative (no leading `/`, no drive prefix)
/// - Normalized (no `.`/`..` components, no empty segments)
/// - Separated by `/` regardless of the host platform
///
/// It is the key that both local and remote collections are indexed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a new RelativePath from a string, normalizing separators
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is empty, absolute or
    /// escapes its root
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let raw: String = path.into();
        let unified = raw.replace('\\', "/");

        if unified.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "Path must be relative: {raw}"
            )));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(DomainError::InvalidPath(format!(
                        "Path escapes root via ..: {raw}"
                    )));
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Err(DomainError::InvalidPath(format!(
                "Path has no components: {raw:?}"
            )));
        }

        Ok(Self(segments.join("/")))
    }

    /// Build a RelativePath from a platform path already stripped of its root
    ///
    /// [`RelativePath::new`] reads `\` as a separator, so a component
    /// containing one cannot be represented.
    ///
    /// # Errors
    /// Returns error if the path is absolute, escapes the root, is not UTF-8
    /// or has a component containing `\`
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(c) => {
                    let s = c.to_str().ok_or_else(|| {
                        DomainError::InvalidPath(format!(
                            "Path is not valid UTF-8: {}",
                            path.display()
                        ))
                    })?;
                    if s.contains('\\') {
                        return Err(DomainError::InvalidPath(format!(
                            "Path component contains a backslash: {}",
                            path.display()
                        )));
                    }
                    segments.push(s);
                }
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidPath(format!(
                        "Path must be relative and normalized: {}",
                        path.display()
                    )));
                }
            }
        }
        Self::new(segments.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns true if this path equals `dir` or lies beneath it
    #[must_use]
    pub fn is_within(&self, dir: &RelativePath) -> bool {
        self.0 == dir.0
            || (self.0.starts_with(&dir.0) && self.0.as_bytes().get(dir.0.len()) == Some(&b'/'))
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

// ============================================================================
// Content fingerprint
// ============================================================================

/// Lowercase hex content digest
///
/// Produced by [`crate::fingerprint`]; two files are considered identical
/// exactly when their fingerprints are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Create a new Fingerprint
    ///
    /// # Errors
    /// Returns error if the digest is empty or not lowercase hex
    pub fn new(digest: String) -> Result<Self, DomainError> {
        if digest.is_empty() {
            return Err(DomainError::InvalidFingerprint(
                "Fingerprint cannot be empty".to_string(),
            ));
        }

        if !digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DomainError::InvalidFingerprint(format!(
                "Fingerprint is not lowercase hex: {digest}"
            )));
        }

        Ok(Self(digest))
    }

    /// Wrap a digest produced by this crate's hasher
    pub(crate) fn from_digest(hex: String) -> Self {
        Self(hex)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

// ============================================================================
// Remote identifiers
// ============================================================================

/// Rejects empty tokens and tokens that cannot be embedded in a URL path segment
fn validate_token(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} cannot be empty"));
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '?' || c == '#')
    {
        return Err(format!("{kind} contains invalid characters: {value}"));
    }
    Ok(())
}

/// Opaque handle of a file in the Remote Store
///
/// Only meaningful to the store that issued it; never derived from a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains separator characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        validate_token("Remote ID", &id).map_err(DomainError::InvalidRemoteId)?;
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

/// Identifier of an organization in the Remote Store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrganizationId(String);

impl OrganizationId {
    /// Create a new OrganizationId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains separator characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        validate_token("Organization ID", &id).map_err(DomainError::InvalidScope)?;
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OrganizationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OrganizationId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<OrganizationId> for String {
    fn from(id: OrganizationId) -> Self {
        id.0
    }
}

/// Identifier of a project in the Remote Store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a new ProjectId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains separator characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        validate_token("Project ID", &id).map_err(DomainError::InvalidScope)?;
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}
