// src/recipe/kitchen/patch.rs

//! Unified diff application
//!
//! Patches are fetched through the kitchen's [`Fetcher`], checked against
//! their optional checksum and applied in declared order. A patch may touch
//! several files; each file section is applied with `diffy`.
//!
//! Application is not transactional: when patch *k* fails, patches before it
//! stay applied and nothing after it is fetched or attempted. The source tree
//! is disposable, so the caller just abandons it.

use super::archive::Fetcher;
use super::verify::verify;
use crate::error::{Error, Result};
use crate::recipe::format::PatchRef;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

const DEV_NULL: &str = "/dev/null";

/// One file's worth of a unified diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Path from the `---` header (`/dev/null` for new files)
    pub old_path: String,
    /// Path from the `+++` header (`/dev/null` for deleted files)
    pub new_path: String,
    /// Normalized section: `---`/`+++` headers followed by the hunks
    pub text: Vec<u8>,
    /// Every hunk has an empty old range (`-0,0`)
    old_empty: bool,
    /// Every hunk has an empty new range (`+0,0`)
    new_empty: bool,
}

impl FileDiff {
    /// Whether this section creates a new file
    ///
    /// Besides a `/dev/null` origin, a section whose hunks all start from an
    /// empty old range creates its target when the target does not exist yet
    /// (`diff -N` output).
    pub fn is_creation(&self) -> bool {
        self.old_path == DEV_NULL
    }

    /// Whether this section deletes a file
    pub fn is_deletion(&self) -> bool {
        self.new_path == DEV_NULL || (self.new_empty && !self.old_empty)
    }

    /// The path the section applies to, before stripping
    pub fn target(&self) -> &str {
        if self.new_path == DEV_NULL {
            &self.old_path
        } else {
            &self.new_path
        }
    }
}

/// Apply patches to a source tree in order
///
/// `index` in the returned errors is 1-based, matching the patch's position in
/// the recipe. `on_patch` is told about each patch before it is fetched.
pub fn apply_patches<F>(
    source_root: &Path,
    patches: &[PatchRef],
    fetcher: &dyn Fetcher,
    mut on_patch: F,
) -> Result<()>
where
    F: FnMut(usize, &PatchRef),
{
    for (i, patch) in patches.iter().enumerate() {
        let index = i + 1;
        info!("Applying patch {}/{}: {}", index, patches.len(), patch.url);
        on_patch(index, patch);

        let content = fetcher.fetch(&patch.url).map_err(|e| Error::PatchFetchError {
            index,
            url: patch.url.clone(),
            reason: e.to_string(),
        })?;

        if let Some(checksum) = &patch.checksum {
            verify(&content, checksum).map_err(|e| match e {
                Error::ChecksumMismatch { expected, actual } => Error::PatchChecksumError {
                    index,
                    url: patch.url.clone(),
                    expected,
                    actual,
                },
                other => other,
            })?;
        }

        apply_patch_text(source_root, &content, patch.strip, index)?;
    }

    Ok(())
}

/// Apply one unified diff (possibly touching several files) to a source tree
///
/// Patch and target files are handled as bytes, so sources in legacy
/// encodings can be patched as long as the hunks' context matches.
pub fn apply_patch_text(
    source_root: &Path,
    text: impl AsRef<[u8]>,
    strip: usize,
    index: usize,
) -> Result<()> {
    let sections = split_file_diffs(text.as_ref());
    if sections.is_empty() {
        return Err(Error::PatchApplyError {
            index,
            file: String::new(),
            reason: "no file sections found in patch".to_string(),
        });
    }

    for section in &sections {
        let apply_err = |reason: String| Error::PatchApplyError {
            index,
            file: section.target().to_string(),
            reason,
        };

        let relative = strip_path(section.target(), strip).ok_or_else(|| {
            apply_err(format!("cannot strip {} components from path", strip))
        })?;
        let path = source_root.join(&relative);
        debug!("Patching {}", path.display());

        let exists = path.exists();
        let base = if section.is_creation() || (section.old_empty && !exists) {
            if exists {
                return Err(apply_err("file to be created already exists".to_string()));
            }
            Vec::new()
        } else {
            match fs::read(&path) {
                Ok(content) => content,
                Err(e) => return Err(apply_err(format!("cannot read target: {}", e))),
            }
        };

        let diff = diffy::Patch::from_bytes(&section.text)
            .map_err(|e| apply_err(format!("malformed diff: {}", e)))?;
        let patched = diffy::apply_bytes(&base, &diff).map_err(|e| apply_err(e.to_string()))?;

        if section.is_deletion() {
            if !patched.is_empty() {
                return Err(apply_err("file to be deleted is not empty after patching".to_string()));
            }
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&path, patched).map_err(|e| Error::io(&path, e))?;
    }

    Ok(())
}

/// Split a unified diff into per-file sections
///
/// A section starts at a `---` line immediately followed by a `+++` line and
/// holds exactly the hunks that follow, each one as long as its `@@` header
/// says. Everything else (`diff --git` and `index` lines, commit messages,
/// the `-- ` signature of `git format-patch`) is dropped.
pub fn split_file_diffs(text: &[u8]) -> Vec<FileDiff> {
    let lines: Vec<&[u8]> = text.split_inclusive(|b| *b == b'\n').collect();
    let mut sections = Vec::new();
    let mut i = 0;

    while i + 1 < lines.len() {
        if !(lines[i].starts_with(b"--- ") && lines[i + 1].starts_with(b"+++ ")) {
            i += 1;
            continue;
        }

        let old_path = header_path(lines[i], "--- ");
        let new_path = header_path(lines[i + 1], "+++ ");
        let mut out = format!("--- {}\n+++ {}\n", old_path, new_path).into_bytes();
        let mut old_empty = true;
        let mut new_empty = true;
        let mut hunks = 0;
        i += 2;

        while let Some(range) = lines.get(i).and_then(|line| parse_hunk_header(line)) {
            let (mut old_left, mut new_left) = (range.old_len, range.new_len);
            old_empty &= range.old_len == 0;
            new_empty &= range.new_len == 0;
            hunks += 1;
            out.extend_from_slice(lines[i]);
            i += 1;

            while (old_left > 0 || new_left > 0) && i < lines.len() {
                let line = lines[i];
                match line.first() {
                    Some(b' ') => {
                        old_left = old_left.saturating_sub(1);
                        new_left = new_left.saturating_sub(1);
                        out.extend_from_slice(line);
                    }
                    // A bare newline is an empty context line whose space was stripped
                    Some(b'\n') | Some(b'\r') => {
                        old_left = old_left.saturating_sub(1);
                        new_left = new_left.saturating_sub(1);
                        out.push(b' ');
                        out.extend_from_slice(line);
                    }
                    Some(b'-') => {
                        old_left = old_left.saturating_sub(1);
                        out.extend_from_slice(line);
                    }
                    Some(b'+') => {
                        new_left = new_left.saturating_sub(1);
                        out.extend_from_slice(line);
                    }
                    Some(b'\\') => out.extend_from_slice(line),
                    _ => break,
                }
                i += 1;
            }

            // "\ No newline at end of file" after the last line of a hunk
            if lines.get(i).is_some_and(|line| line.starts_with(b"\\")) {
                out.extend_from_slice(lines[i]);
                i += 1;
            }
        }

        sections.push(FileDiff {
            old_path,
            new_path,
            text: out,
            old_empty: hunks > 0 && old_empty,
            new_empty: hunks > 0 && new_empty,
        });
    }

    sections
}

/// Line counts from a `@@ -a[,b] +c[,d] @@` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkRange {
    old_len: usize,
    new_len: usize,
}

fn parse_hunk_header(line: &[u8]) -> Option<HunkRange> {
    let line = std::str::from_utf8(line).ok()?;
    let rest = line.strip_prefix("@@ -")?;
    let (ranges, _) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(" +")?;

    Some(HunkRange {
        old_len: range_len(old)?,
        new_len: range_len(new)?,
    })
}

/// Length of a `start[,len]` range; a missing length means one line
fn range_len(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((start, len)) => {
            start.parse::<usize>().ok()?;
            len.parse().ok()
        }
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

/// Extract the path from a `---`/`+++` header, dropping any timestamp
fn header_path(line: &[u8], marker: &str) -> String {
    let line = String::from_utf8_lossy(line);
    let rest = line.trim_end_matches(['\r', '\n']);
    let rest = rest.strip_prefix(marker).unwrap_or(rest);
    let path = rest.split('\t').next().unwrap_or(rest).trim();
    path.to_string()
}

/// Remove `strip` leading components, refusing paths that escape the tree
fn strip_path(path: &str, strip: usize) -> Option<PathBuf> {
    let components: Vec<Component> = Path::new(path).components().collect();
    if components.iter().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
        return None;
    }

    let normal: Vec<_> = components
        .into_iter()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if normal.len() <= strip {
        return None;
    }

    Some(normal[strip..].iter().collect())
}
