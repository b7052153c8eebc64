// src/recipe/kitchen/stager.rs

//! Placing build outputs into the install prefix

use crate::error::{Error, Result};
use crate::recipe::format::Artifact;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Create a directory and its parents; succeeds if it already exists
pub fn ensure_directory(path: &Path) -> Result<()> {
    debug!("Ensuring directory {}", path.display());
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

/// Copy a file or directory tree to `dest`, creating missing parents
///
/// Returns the files written. File permissions are preserved.
pub fn place_artifact(source: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let metadata = fs::symlink_metadata(source).map_err(|e| Error::io(source, e))?;

    if let Some(parent) = dest.parent() {
        ensure_directory(parent)?;
    }

    if !metadata.is_dir() {
        copy_entry(source, dest, &metadata)?;
        return Ok(vec![dest.to_path_buf()]);
    }

    let mut placed = Vec::new();
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            Error::io(path, io::Error::other(e.to_string()))
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::io(entry.path(), io::Error::other(e.to_string())))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            ensure_directory(&target)?;
        } else {
            let metadata = entry.metadata().map_err(|e| {
                Error::io(entry.path(), io::Error::other(e.to_string()))
            })?;
            copy_entry(entry.path(), &target, &metadata)?;
            placed.push(target);
        }
    }

    Ok(placed)
}

fn copy_entry(source: &Path, dest: &Path, metadata: &fs::Metadata) -> Result<()> {
    #[cfg(unix)]
    {
        if metadata.file_type().is_symlink() {
            let link = fs::read_link(source).map_err(|e| Error::io(source, e))?;
            if fs::symlink_metadata(dest).is_ok() {
                fs::remove_file(dest).map_err(|e| Error::io(dest, e))?;
            }
            return std::os::unix::fs::symlink(&link, dest).map_err(|e| Error::io(dest, e));
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    fs::copy(source, dest)
        .map(|_| ())
        .map_err(|e| Error::io(dest, e))
}

/// Install every build output matching `artifact.from` under `prefix/artifact.to`
///
/// `from` is a glob relative to the source root (`dat/*.lev`, `src/nethack`).
/// A pattern that matches nothing is a `NotFound` IO error.
pub fn install(source_root: &Path, prefix: &Path, artifact: &Artifact) -> Result<Vec<PathBuf>> {
    let root = glob::Pattern::escape(&source_root.to_string_lossy());
    let pattern = format!("{}/{}", root, artifact.from);
    let dest_dir: PathBuf = Path::new(&artifact.to)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .fold(prefix.to_path_buf(), |dir, c| dir.join(c));

    let matches: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| {
            Error::io(
                source_root.join(&artifact.from),
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
            )
        })?
        .map(|m| {
            m.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::io(path, e.into_error())
            })
        })
        .collect::<Result<_>>()?;

    if matches.is_empty() {
        return Err(Error::io(
            source_root.join(&artifact.from),
            io::Error::new(io::ErrorKind::NotFound, "no build output matches"),
        ));
    }

    info!(
        "Installing {} ({} match(es)) into {}",
        artifact.from,
        matches.len(),
        dest_dir.display()
    );

    let mut placed = Vec::new();
    for source in matches {
        let Some(name) = source.file_name() else {
            continue;
        };
        placed.extend(place_artifact(&source, &dest_dir.join(name))?);
    }

    Ok(placed)
}

/// Create an empty file if it does not exist; existing content is kept
pub fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    debug!("Touching {}", path.display());
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| Error::io(path, e))
}
