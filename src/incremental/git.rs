//! Changed-set extraction via libgit2
//!
//! When a repository is available, the changed set is the union of the
//! name-only diff from the base ref to HEAD (added/copied/modified renamed),
//! the working-tree status against HEAD, and untracked unignored files.
//! Renames are reported separately so the planner can migrate cache entries
//! instead of re-analyzing. Without a repository the engine degrades to
//! hash-everything change detection.

use crate::error::DoxyError;
use git2::{Delta, DiffFindOptions, DiffOptions, Repository, StatusOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// A rename reported by the version control system, repo-root-relative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// What the version control system knows about this run.
#[derive(Debug, Default)]
pub struct GitChanges {
    /// False when no usable repository was found; change detection then
    /// falls back to content hashing.
    pub available: bool,
    /// Paths (relative to the analysis root) that changed.
    pub changed: BTreeSet<String>,
    pub renames: Vec<Rename>,
}

/// Collect the changed set for `root`, optionally against a base ref.
///
/// A requested-but-unresolvable base ref is a configuration error (the
/// flag requires history the clone does not have); an absent repository is
/// a soft condition.
pub fn collect_changes(root: &Path, base_ref: Option<&str>) -> Result<GitChanges, DoxyError> {
    let repo = match Repository::discover(root) {
        Ok(repo) => repo,
        Err(e) => {
            debug!("no git repository at {}: {e}", root.display());
            if base_ref.is_some() {
                return Err(DoxyError::Config(
                    "a base ref was requested but no git repository is available".into(),
                ));
            }
            return Ok(GitChanges::default());
        }
    };

    let Some(workdir) = repo.workdir().map(Path::to_path_buf) else {
        warn!("bare repository; treating git as unavailable");
        return Ok(GitChanges::default());
    };

    let mut changes = GitChanges {
        available: true,
        ..Default::default()
    };

    if let Some(base) = base_ref {
        diff_base_to_head(&repo, base, root, &workdir, &mut changes)?;
    }

    // Working tree vs HEAD: staged, unstaged, and untracked unignored.
    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    let statuses = repo
        .statuses(Some(&mut options))
        .map_err(|e| DoxyError::Project(format!("git status failed: {e}")))?;
    for entry in statuses.iter() {
        if let Some(path) = entry.path() {
            if let Some(rel) = to_root_relative(path, root, &workdir) {
                changes.changed.insert(rel);
            }
        }
    }

    debug!(
        "git changed set: {} paths, {} renames (base: {:?})",
        changes.changed.len(),
        changes.renames.len(),
        base_ref
    );
    Ok(changes)
}

fn diff_base_to_head(
    repo: &Repository,
    base: &str,
    root: &Path,
    workdir: &Path,
    changes: &mut GitChanges,
) -> Result<(), DoxyError> {
    let base_tree = repo
        .revparse_single(base)
        .and_then(|obj| obj.peel_to_commit())
        .and_then(|commit| commit.tree())
        .map_err(|e| {
            DoxyError::Config(format!(
                "cannot resolve base ref '{base}' (shallow clone?): {e}"
            ))
        })?;
    let head_tree = repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .and_then(|commit| commit.tree())
        .map_err(|e| DoxyError::Project(format!("cannot resolve HEAD: {e}")))?;

    let mut diff_options = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut diff_options))
        .map_err(|e| DoxyError::Project(format!("git diff failed: {e}")))?;

    let mut find = DiffFindOptions::new();
    find.renames(true);
    diff.find_similar(Some(&mut find))
        .map_err(|e| DoxyError::Project(format!("git rename detection failed: {e}")))?;

    for delta in diff.deltas() {
        let new_path = delta
            .new_file()
            .path()
            .and_then(|p| p.to_str())
            .map(str::to_string);
        match delta.status() {
            Delta::Added | Delta::Copied | Delta::Modified => {
                if let Some(path) = new_path {
                    if let Some(rel) = to_root_relative(&path, root, workdir) {
                        changes.changed.insert(rel);
                    }
                }
            }
            Delta::Renamed => {
                let old_path = delta
                    .old_file()
                    .path()
                    .and_then(|p| p.to_str())
                    .map(str::to_string);
                if let (Some(from), Some(to)) = (old_path, new_path) {
                    let from = to_root_relative(&from, root, workdir);
                    let to = to_root_relative(&to, root, workdir);
                    if let (Some(from), Some(to)) = (from, to) {
                        changes.changed.insert(to.clone());
                        changes.renames.push(Rename { from, to });
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Map a workdir-relative git path to an analysis-root-relative path,
/// dropping anything outside the root.
fn to_root_relative(git_path: &str, root: &Path, workdir: &Path) -> Option<String> {
    let absolute = workdir.join(git_path);
    let relative = absolute.strip_prefix(root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}
