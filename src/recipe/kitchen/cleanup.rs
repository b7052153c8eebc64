// src/recipe/kitchen/cleanup.rs

//! Post-install clean pass
//!
//! The clean pass removes build leftovers, empty directories in the install
//! prefix and the per-attempt build directory. Before any path is removed the
//! [`CleanupPolicy`] is asked whether it must be kept; runtime state
//! directories (a game's save directory, a spool) hold data created after
//! installation and are never removed.

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Decides whether the clean pass must leave a path alone
pub trait CleanupPolicy: Send + Sync {
    /// Return true if `path` must be preserved
    fn should_skip_clean(&self, path: &Path, install_prefix: &Path) -> bool;
}

/// Policy protecting a fixed set of prefix-relative paths
#[derive(Debug, Clone, Default)]
pub struct ProtectedPaths {
    relative: Vec<PathBuf>,
}

impl ProtectedPaths {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            relative: paths
                .into_iter()
                .map(|p| normalize(Path::new(p.as_ref())))
                .collect(),
        }
    }

    /// State directories and `skip_clean` entries of a recipe
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self::new(recipe.protected_paths())
    }
}

impl CleanupPolicy for ProtectedPaths {
    fn should_skip_clean(&self, path: &Path, install_prefix: &Path) -> bool {
        let candidate = normalize(path);
        self.relative
            .iter()
            .any(|rel| normalize(&install_prefix.join(rel)) == candidate)
    }
}

/// Lexically normalize a path: drop `.` and resolve `..` against earlier components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Outcome of a clean pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Paths that were removed
    pub removed: Vec<PathBuf>,
    /// Paths kept because the policy protects them
    pub skipped: Vec<PathBuf>,
}

impl CleanReport {
    /// Fold another pass into this one; a path is reported skipped once
    pub fn merge(&mut self, other: CleanReport) {
        self.removed.extend(other.removed);
        for path in other.skipped {
            if !self.skipped.contains(&path) {
                self.skipped.push(path);
            }
        }
    }
}

/// Remove `paths`, recursively for directories, honoring `policy`
///
/// The policy is consulted for every path before it is removed, including
/// entries inside a directory being removed. A protected path is recorded as
/// skipped and the pass moves on; its parents are left in place. Paths that do
/// not exist are ignored.
pub fn clean(
    paths: &[PathBuf],
    install_prefix: &Path,
    policy: &dyn CleanupPolicy,
) -> Result<CleanReport> {
    let mut report = CleanReport::default();

    for path in paths {
        if remove_path(path, install_prefix, policy, &mut report)? {
            info!("Removed {}", path.display());
            report.removed.push(path.clone());
        }
    }

    Ok(report)
}

/// Returns true when `path` is gone afterwards
fn remove_path(
    path: &Path,
    install_prefix: &Path,
    policy: &dyn CleanupPolicy,
    report: &mut CleanReport,
) -> Result<bool> {
    if policy.should_skip_clean(path, install_prefix) {
        warn!("Skipping clean of protected path {}", path.display());
        report.skipped.push(path.to_path_buf());
        return Ok(false);
    }

    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} already absent", path.display());
            return Ok(false);
        }
        Err(e) => return Err(Error::io(path, e)),
    };

    if !metadata.is_dir() {
        fs::remove_file(path).map_err(|e| Error::io(path, e))?;
        return Ok(true);
    }

    let mut emptied = true;
    for entry in fs::read_dir(path).map_err(|e| Error::io(path, e))? {
        let entry = entry.map_err(|e| Error::io(path, e))?;
        let child = entry.path();
        let exists_after = !remove_path(&child, install_prefix, policy, report)?;
        if exists_after && fs::symlink_metadata(&child).is_ok() {
            emptied = false;
        }
    }

    if !emptied {
        debug!("Keeping {}: it holds protected paths", path.display());
        return Ok(false);
    }

    fs::remove_dir(path).map_err(|e| Error::io(path, e))?;
    Ok(true)
}

/// Remove empty directories under `install_prefix`, deepest first
///
/// Directories that become empty once their children are removed go too.
/// Protected directories and everything beneath them are kept; an empty
/// protected directory is reported as skipped.
pub fn prune_empty_dirs(install_prefix: &Path, policy: &dyn CleanupPolicy) -> Result<CleanReport> {
    let mut report = CleanReport::default();
    if !install_prefix.is_dir() {
        return Ok(report);
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(install_prefix).min_depth(1).contents_first(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(install_prefix).to_path_buf();
            Error::io(path, io::Error::other(e.to_string()))
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    for dir in dirs {
        if !is_empty_dir(&dir)? {
            continue;
        }

        if let Some(protected) = dir
            .ancestors()
            .take_while(|a| a != &install_prefix)
            .find(|a| policy.should_skip_clean(a, install_prefix))
        {
            if protected == dir {
                warn!("Skipping clean of protected path {}", dir.display());
                report.skipped.push(dir);
            }
            continue;
        }

        debug!("Removing empty directory {}", dir.display());
        fs::remove_dir(&dir).map_err(|e| Error::io(&dir, e))?;
        report.removed.push(dir);
    }

    Ok(report)
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| Error::io(path, e))?;
    Ok(entries.next().is_none())
}
