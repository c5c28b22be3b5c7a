//! Local inventory builder
//!
//! Walks a sync root and fingerprints every file that should exist
//! remotely. Filters are applied in this order:
//!
//! 1. version-control directories are pruned without being descended
//! 2. files above `max_file_size` are skipped
//! 3. editor temp files (name ending in `~`) are skipped
//! 4. paths excluded by `.gitignore` or `.projsyncignore` are skipped
//! 5. paths outside the selected category are skipped
//! 6. files with a NUL byte in their first 8 KiB are skipped as binary
//! 7. files that are not valid UTF-8 are skipped
//!
//! Only a missing or non-directory root is an error; every per-file problem
//! leaves the file out of the inventory.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use projsync_core::domain::newtypes::RelativePath;
use projsync_core::domain::records::{FileRecord, LocalInventory};
use projsync_core::fingerprint;

use crate::category::FileCategory;
use crate::ignore::ExclusionRuleSet;
use crate::SyncError;

/// Version-control metadata directories, never descended into
pub const PRUNED_DIRS: &[&str] = &[".git", ".svn", ".hg", ".bzr", "_darcs", "CVS"];

/// Bytes sampled by the binary-content check
pub const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Default size ceiling in bytes
pub const DEFAULT_MAX_FILE_SIZE: u64 = 32 * 1024;

/// Options for one inventory build
#[derive(Debug, Clone)]
pub struct InventoryOptions {
    /// Files larger than this many bytes are skipped
    pub max_file_size: u64,
    /// Keep only files in this category
    pub category: Option<FileCategory>,
    /// Directories (relative to the root) whose contents are left out
    pub excluded_roots: Vec<RelativePath>,
}

impl Default for InventoryOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            category: None,
            excluded_roots: Vec::new(),
        }
    }
}

impl InventoryOptions {
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_category(mut self, category: FileCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_excluded_roots(mut self, roots: Vec<RelativePath>) -> Self {
        self.excluded_roots = roots;
        self
    }
}

/// Returns true for directory names that are pruned outright
pub(crate) fn is_pruned_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| PRUNED_DIRS.contains(&name))
}

/// Root-relative path of a walk entry
pub(crate) fn relative_to(root: &Path, entry: &DirEntry) -> Option<RelativePath> {
    let stripped = entry.path().strip_prefix(root).ok()?;
    match RelativePath::from_path(stripped) {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(path = %entry.path().display(), %err, "Skipping unrepresentable path");
            None
        }
    }
}

/// Checks that `root` exists and is a directory
pub fn ensure_root(root: &Path) -> Result<(), SyncError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SyncError::RootNotDirectory(root.to_path_buf())),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(SyncError::RootNotFound(root.to_path_buf()))
        }
        Err(err) => Err(SyncError::Io(err)),
    }
}

/// Returns true if the sampled prefix of the file contains a NUL byte
fn looks_binary(path: &Path) -> std::io::Result<bool> {
    let mut buf = [0u8; BINARY_SNIFF_LEN];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(buf[..filled].contains(&0))
}

/// Builds the inventory of `root`
///
/// Blocking; async callers should run it on a blocking thread.
///
/// # Errors
/// Returns `SyncError::RootNotFound` or `SyncError::RootNotDirectory` when
/// the root is unusable. Nothing else is fatal.
pub fn build_inventory(root: &Path, options: &InventoryOptions) -> Result<LocalInventory, SyncError> {
    ensure_root(root)?;

    let rules = ExclusionRuleSet::load(root);
    let mut inventory = LocalInventory::new(root);
    let mut skipped = 0u64;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            if is_pruned_dir(entry) {
                return false;
            }
            match relative_to(root, entry) {
                Some(rel) => {
                    !options.excluded_roots.iter().any(|ex| rel.is_within(ex))
                        && !rules.is_excluded(&rel, true)
                }
                None => false,
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "Skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(rel) = relative_to(root, &entry) else {
            skipped += 1;
            continue;
        };

        match admit(&entry, &rel, &rules, options) {
            Some(content) => {
                let record = FileRecord::new(rel, fingerprint::normalized(&content));
                inventory.insert(record);
            }
            None => skipped += 1,
        }
    }

    info!(
        root = %root.display(),
        files = inventory.len(),
        skipped,
        "Built local inventory"
    );
    Ok(inventory)
}

/// Applies the per-file filters and returns the file's text when it passes
fn admit(
    entry: &DirEntry,
    rel: &RelativePath,
    rules: &ExclusionRuleSet,
    options: &InventoryOptions,
) -> Option<String> {
    let size = match entry.metadata() {
        Ok(meta) => meta.len(),
        Err(err) => {
            debug!(path = %rel, %err, "Skipping file without metadata");
            return None;
        }
    };
    if size > options.max_file_size {
        debug!(path = %rel, size, "Skipping oversized file");
        return None;
    }

    if rel.file_name().ends_with('~') {
        debug!(path = %rel, "Skipping editor temp file");
        return None;
    }

    if rules.is_excluded(rel, false) {
        debug!(path = %rel, "Skipping excluded file");
        return None;
    }

    if let Some(category) = &options.category {
        if !category.includes(rel) {
            debug!(path = %rel, category = category.name(), "Skipping file outside category");
            return None;
        }
    }

    match looks_binary(entry.path()) {
        Ok(true) => {
            debug!(path = %rel, "Skipping binary file");
            return None;
        }
        Ok(false) => {}
        Err(err) => {
            debug!(path = %rel, %err, "Skipping unreadable file");
            return None;
        }
    }

    match std::fs::read_to_string(entry.path()) {
        Ok(content) => Some(content),
        Err(err) if err.kind() == ErrorKind::InvalidData => {
            debug!(path = %rel, "Skipping file that is not valid UTF-8");
            None
        }
        Err(err) => {
            debug!(path = %rel, %err, "Skipping unreadable file");
            None
        }
    }
}
