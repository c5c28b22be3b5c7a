//! Submodule discovery
//!
//! A submodule root is a descendant directory of the sync root that contains
//! one of the configured marker files (build manifests such as `Cargo.toml`
//! or `package.json`). Each one syncs into its own remote project, named
//! `"{parent}-SubModule-{directory}"`.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use projsync_core::domain::newtypes::{OrganizationId, RelativePath};
use projsync_core::domain::records::{RemoteProject, Scope};

use crate::ignore::ExclusionRuleSet;
use crate::inventory::{ensure_root, is_pruned_dir, relative_to};
use crate::SyncError;

/// Separator between the parent project name and the submodule directory
pub const SUBMODULE_NAME_INFIX: &str = "-SubModule-";

/// A nested project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleRoot {
    /// Absolute location on disk
    pub path: PathBuf,
    /// Location relative to the sync root
    pub relative: RelativePath,
    /// The marker file that identified it
    pub marker: String,
}

impl SubmoduleRoot {
    /// Name of the directory holding the submodule
    pub fn dir_name(&self) -> &str {
        self.relative.file_name()
    }

    /// Remote project name for this submodule under `parent`
    pub fn project_name(&self, parent: &str) -> String {
        format!("{parent}{SUBMODULE_NAME_INFIX}{}", self.dir_name())
    }
}

/// Finds every submodule root beneath `root`
///
/// The root itself is never reported. Version-control directories and
/// directories excluded by the root's ignore files are not searched.
/// Results are in path order.
///
/// # Errors
/// Returns an error if `root` is missing or not a directory
pub fn discover_submodules(root: &Path, markers: &[String]) -> Result<Vec<SubmoduleRoot>, SyncError> {
    ensure_root(root)?;
    if markers.is_empty() {
        return Ok(Vec::new());
    }

    let rules = ExclusionRuleSet::load(root);
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.file_type().is_dir()
                && !is_pruned_dir(entry)
                && relative_to(root, entry).is_some_and(|rel| !rules.is_excluded(&rel, true))
        });

    for entry in walker.filter_map(Result::ok) {
        let Some(marker) = markers.iter().find(|m| entry.path().join(m).is_file()) else {
            continue;
        };
        let Some(relative) = relative_to(root, &entry) else {
            continue;
        };

        debug!(path = %relative, marker = %marker, "Discovered submodule");
        found.push(SubmoduleRoot {
            path: entry.path().to_path_buf(),
            relative,
            marker: marker.clone(),
        });
    }

    Ok(found)
}

/// Submodule roots strictly beneath `parent`, relative to `parent`
pub fn nested_within(parent: Option<&RelativePath>, submodules: &[SubmoduleRoot]) -> Vec<RelativePath> {
    submodules
        .iter()
        .filter_map(|sub| match parent {
            None => Some(sub.relative.clone()),
            Some(parent) if sub.relative != *parent && sub.relative.is_within(parent) => {
                let rest = &sub.relative.as_str()[parent.as_str().len() + 1..];
                RelativePath::new(rest).ok()
            }
            Some(_) => None,
        })
        .collect()
}

/// Scope of the active (non-archived) project with the submodule's name
pub fn resolve_scope(
    organization: &OrganizationId,
    parent_name: &str,
    submodule: &SubmoduleRoot,
    projects: &[RemoteProject],
) -> Option<Scope> {
    let wanted = submodule.project_name(parent_name);
    projects
        .iter()
        .find(|p| !p.archived && p.name == wanted)
        .map(|p| Scope::new(organization.clone(), p.id.clone()))
}
