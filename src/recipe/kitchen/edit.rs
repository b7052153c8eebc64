// src/recipe/kitchen/edit.rs

//! Literal source text edits
//!
//! Edits bake install-time values (usually the install prefix) into source
//! files before compilation. Matching is exact text, never a regex. A pattern
//! that is not found is an error: it almost always means upstream changed and
//! the recipe needs revisiting.

use crate::error::{Error, Result};
use crate::recipe::format::TextEdit;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Apply edits to files under `source_root`, in order
///
/// `substitute` expands the replacement template (e.g. `%(prefix)s`).
pub fn apply_edits<F>(source_root: &Path, edits: &[TextEdit], substitute: F) -> Result<()>
where
    F: Fn(&str) -> String,
{
    for edit in edits {
        let path = source_root.join(&edit.file);
        info!("Editing {}", edit.file);

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::EditTargetMissing { path });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        let replacement = substitute(&edit.replacement);
        let (edited, occurrences) =
            replace_all(&content, edit.pattern.as_bytes(), replacement.as_bytes());
        if occurrences == 0 {
            return Err(Error::EditPatternNotFound {
                path,
                pattern: edit.pattern.clone(),
            });
        }

        debug!(
            "Replaced {} occurrence(s) of {:?} with {:?}",
            occurrences, edit.pattern, replacement
        );
        fs::write(&path, edited).map_err(|e| Error::io(&path, e))?;
    }

    Ok(())
}

/// Replace every non-overlapping occurrence of `pattern`, left to right
///
/// Works on raw bytes so files in legacy encodings can be edited. An empty
/// pattern never matches.
fn replace_all(content: &[u8], pattern: &[u8], replacement: &[u8]) -> (Vec<u8>, usize) {
    if pattern.is_empty() {
        return (content.to_vec(), 0);
    }

    let mut out = Vec::with_capacity(content.len());
    let mut count = 0;
    let mut rest = content;
    while let Some(pos) = rest.windows(pattern.len()).position(|w| w == pattern) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(replacement);
        rest = &rest[pos + pattern.len()..];
        count += 1;
    }
    out.extend_from_slice(rest);

    (out, count)
}
