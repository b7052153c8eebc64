// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::recipe::format::Recipe;
use std::path::{Component, Path};

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

    parse_recipe(&content)
}

/// Check that a recipe path stays inside the directory it is relative to
///
/// Absolute paths and any `..` component are rejected.
pub fn is_confined(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Validate a recipe for completeness and correctness
///
/// Returns warnings for things that are allowed but probably unintended.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if recipe.package.name.is_empty() {
        return Err(Error::ParseError("Recipe package name cannot be empty".to_string()));
    }
    if recipe.package.version.is_empty() {
        return Err(Error::ParseError("Recipe package version cannot be empty".to_string()));
    }

    Hash::parse_prefixed(&recipe.source.checksum).map_err(|e| Error::InvalidChecksum {
        checksum: recipe.source.checksum.clone(),
        reason: e.to_string(),
    })?;

    for (i, patch) in recipe.patches.iter().enumerate() {
        match &patch.checksum {
            Some(checksum) => {
                Hash::parse_prefixed(checksum).map_err(|e| Error::InvalidChecksum {
                    checksum: checksum.clone(),
                    reason: format!("patch {}: {}", i + 1, e),
                })?;
            }
            None if patch.is_remote() => {
                warnings.push(format!("Remote patch {} has no checksum", patch.url));
            }
            None => {}
        }
    }

    let mut paths: Vec<(&str, &str)> = Vec::new();
    if let Some(dir) = &recipe.source.extract_dir {
        paths.push(("extract_dir", dir.as_str()));
    }
    paths.extend(recipe.edits.iter().map(|e| ("edit file", e.file.as_str())));
    paths.extend(
        recipe
            .build
            .steps
            .iter()
            .filter_map(|s| s.workdir.as_deref())
            .map(|w| ("build workdir", w)),
    );
    paths.extend(recipe.install.state_dirs.iter().map(|p| ("state dir", p.as_str())));
    paths.extend(recipe.install.skip_clean.iter().map(|p| ("skip_clean path", p.as_str())));
    paths.extend(recipe.install.touch.iter().map(|p| ("touch path", p.as_str())));
    paths.extend(recipe.install.clean.iter().map(|p| ("clean path", p.as_str())));
    for artifact in &recipe.install.artifacts {
        paths.push(("artifact source", artifact.from.as_str()));
        paths.push(("artifact destination", artifact.to.as_str()));
    }

    for (what, path) in paths {
        if !is_confined(path) {
            return Err(Error::ParseError(format!(
                "{} must be a relative path without '..': {:?}",
                what, path
            )));
        }
    }

    if let Some(step) = recipe.build.steps.iter().find(|s| s.command.trim().is_empty()) {
        return Err(Error::ParseError(format!(
            "Build step has an empty command: {:?}",
            step
        )));
    }

    if recipe.build.jobs == Some(0) {
        return Err(Error::ParseError("build.jobs must be at least 1".to_string()));
    }

    if recipe.package.summary.is_none() {
        warnings.push("Missing package summary".to_string());
    }
    if recipe.package.license.is_none() {
        warnings.push("Missing package license".to_string());
    }
    if recipe.package.homepage.is_none() {
        warnings.push("Missing package homepage".to_string());
    }
    if recipe.build.steps.is_empty() {
        warnings.push("No build steps specified".to_string());
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::format::EnvOverride;

    const NETHACK: &str = r#"
[package]
name = "nethack"
version = "3.4.3"
homepage = "http://www.nethack.org/index.html"

[source]
archive = "http://downloads.sourceforge.net/project/nethack/nethack/%(version)s/nethack-343-src.tgz"
checksum = "md5:21479c95990eefe7650df582426457f9"

[[patches]]
url = "http://github.com/adamv/nethack-osx/raw/82992eb6e4d8c76b05037579126293d644ef971d/patches/nethack-osx-343.patch"

[[edits]]
file = "include/config.h"
pattern = '#  define HACKDIR "/usr/games/lib/nethackdir"'
replacement = '#define HACKDIR "%(prefix)s"'

[environment]
CFLAGS = { append = "-I../include" }

[build]
jobs = 1

[[build.steps]]
command = "sh"
args = ["sys/unix/setup.sh"]

[[build.steps]]
command = "make"
workdir = "src"

[install]
state_dirs = ["save"]
touch = ["perm", "logfile"]

[[install.artifacts]]
from = "src/nethack"
to = "bin"
"#;

    #[test]
    fn test_parse_valid_recipe() {
        let recipe = parse_recipe(NETHACK).unwrap();
        assert_eq!(recipe.package.name, "nethack");
        assert_eq!(recipe.patches.len(), 1);
        assert_eq!(recipe.patches[0].strip, 1);
        assert_eq!(recipe.edits[0].file, "include/config.h");
        assert_eq!(
            recipe.environment.get("CFLAGS"),
            Some(&EnvOverride::Append("-I../include".to_string()))
        );
        assert_eq!(recipe.build.jobs, Some(1));
        assert_eq!(recipe.build.steps[1].workdir.as_deref(), Some("src"));
        assert_eq!(recipe.install.state_dirs, vec!["save"]);
        assert_eq!(recipe.install.artifacts[0].to, "bin");
    }

    #[test]
    fn test_parse_invalid_recipe() {
        let content = "this is not valid toml at all {}";
        assert!(parse_recipe(content).is_err());
    }

    #[test]
    fn test_parse_minimal_recipe_defaults() {
        let content = r#"
[package]
name = "test"
version = "1.0"

[source]
archive = "https://example.com/test-1.0.tar.gz"
checksum = "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
"#;
        let recipe = parse_recipe(content).unwrap();
        assert!(recipe.patches.is_empty());
        assert!(recipe.edits.is_empty());
        assert!(recipe.build.steps.is_empty());
        assert!(recipe.install.artifacts.is_empty());
    }

    #[test]
    fn test_validate_nethack_warnings() {
        let recipe = parse_recipe(NETHACK).unwrap();
        let warnings = validate_recipe(&recipe).unwrap();
        assert!(warnings.iter().any(|w| w.contains("summary")));
        assert!(warnings.iter().any(|w| w.contains("license")));
        assert!(warnings.iter().any(|w| w.contains("has no checksum")));
        assert!(!warnings.iter().any(|w| w.contains("homepage")));
    }

    #[test]
    fn test_validate_empty_name() {
        let mut recipe = parse_recipe(NETHACK).unwrap();
        recipe.package.name.clear();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_bad_checksum() {
        let mut recipe = parse_recipe(NETHACK).unwrap();
        recipe.source.checksum = "crc32:abc123".to_string();
        let err = validate_recipe(&recipe).unwrap_err();
        assert!(matches!(err, Error::InvalidChecksum { .. }));
    }

    #[test]
    fn test_validate_rejects_escaping_paths() {
        let mut recipe = parse_recipe(NETHACK).unwrap();
        recipe.install.state_dirs.push("../outside".to_string());
        assert!(validate_recipe(&recipe).is_err());

        let mut recipe = parse_recipe(NETHACK).unwrap();
        recipe.edits[0].file = "/etc/passwd".to_string();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_zero_jobs() {
        let mut recipe = parse_recipe(NETHACK).unwrap();
        recipe.build.jobs = Some(0);
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_is_confined() {
        assert!(is_confined("save"));
        assert!(is_confined("./share/doc"));
        assert!(is_confined("dat/*.lev"));
        assert!(!is_confined(""));
        assert!(!is_confined("/usr/bin"));
        assert!(!is_confined("a/../../b"));
    }
}
