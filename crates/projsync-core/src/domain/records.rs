//! Local and remote file collections
//!
//! A sync compares two collections keyed by [`RelativePath`]: the
//! [`LocalInventory`] built from disk and the listing of
//! [`RemoteFileEntry`] values returned by the Remote Store.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::newtypes::{Fingerprint, OrganizationId, ProjectId, RelativePath, RemoteId};

// ============================================================================
// Scope
// ============================================================================

/// The (organization, project) pair addressing one remote file collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub organization: OrganizationId,
    pub project: ProjectId,
}

impl Scope {
    /// Create a new Scope
    pub fn new(organization: OrganizationId, project: ProjectId) -> Self {
        Self {
            organization,
            project,
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.project)
    }
}

// ============================================================================
// Local side
// ============================================================================

/// A single local file that passed every inventory filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: RelativePath,
    pub fingerprint: Fingerprint,
}

impl FileRecord {
    pub fn new(path: RelativePath, fingerprint: Fingerprint) -> Self {
        Self { path, fingerprint }
    }
}

/// Snapshot of the syncable files under one root
///
/// Built fresh on every sync; keys are unique root-relative paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalInventory {
    root: PathBuf,
    files: BTreeMap<RelativePath, FileRecord>,
}

impl LocalInventory {
    /// Creates an empty inventory for the given root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
        }
    }

    /// Inserts a record, replacing any previous record at the same path
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.files.insert(record.path.clone(), record)
    }

    /// Removes the record at `path`
    pub fn remove(&mut self, path: &RelativePath) -> Option<FileRecord> {
        self.files.remove(path)
    }

    pub fn get(&self, path: &RelativePath) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &RelativePath) -> bool {
        self.files.contains_key(path)
    }

    /// Root directory the inventory was built from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative path on disk
    pub fn absolute_path(&self, path: &RelativePath) -> PathBuf {
        path.as_str()
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    /// Records in path order
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ============================================================================
// Remote side
// ============================================================================

/// A file as listed by the Remote Store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileEntry {
    pub path: RelativePath,
    pub fingerprint: Fingerprint,
    /// Handle required to delete the entry; never derived from `path`
    pub remote_id: RemoteId,
}

impl RemoteFileEntry {
    pub fn new(path: RelativePath, fingerprint: Fingerprint, remote_id: RemoteId) -> Self {
        Self {
            path,
            fingerprint,
            remote_id,
        }
    }
}

/// A project in the Remote Store's organization directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProject {
    pub id: ProjectId,
    pub name: String,
    pub archived: bool,
}
