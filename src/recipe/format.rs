// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are TOML files that describe how to fetch, patch, build and
//! install one package from source. A recipe is a plain value: nothing in
//! the kitchen ever mutates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder for the install prefix in templates
pub const PREFIX_VAR: &str = "%(prefix)s";

/// A complete recipe for building a package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package metadata
    pub package: PackageSection,

    /// Source archive and its checksum
    pub source: SourceSection,

    /// Patches to apply, in order
    #[serde(default)]
    pub patches: Vec<PatchRef>,

    /// Literal text edits to apply after patching, in order
    #[serde(default)]
    pub edits: Vec<TextEdit>,

    /// Environment overrides for build steps
    #[serde(default)]
    pub environment: BTreeMap<String, EnvOverride>,

    /// Build instructions
    #[serde(default)]
    pub build: BuildSection,

    /// Install layout
    #[serde(default)]
    pub install: InstallSection,

    /// Variables for substitution (optional)
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Recipe {
    /// Substitute variables in a string
    ///
    /// Replaces `%(name)s` patterns in a single left-to-right pass. Built-in
    /// variables (`version`, `name`, `prefix`) win over custom variables from
    /// the `[variables]` section. A custom value may use the built-ins but not
    /// other custom variables. Unknown names are left as written.
    pub fn substitute(&self, template: &str, prefix: &str) -> String {
        expand(template, |key| {
            self.builtin(key, prefix).or_else(|| {
                self.variables
                    .get(key)
                    .map(|value| expand(value, |key| self.builtin(key, prefix)))
            })
        })
    }

    fn builtin(&self, key: &str, prefix: &str) -> Option<String> {
        match key {
            "version" => Some(self.package.version.clone()),
            "name" => Some(self.package.name.clone()),
            "prefix" => Some(prefix.to_string()),
            _ => None,
        }
    }

    /// Get the archive URL with variables substituted
    pub fn archive_url(&self) -> String {
        self.substitute(&self.source.archive, "")
    }

    /// Get the archive filename from the URL
    pub fn archive_filename(&self) -> String {
        self.archive_url()
            .split('/')
            .next_back()
            .filter(|name| !name.is_empty())
            .unwrap_or("source.tar.gz")
            .to_string()
    }

    /// Prefix-relative paths the clean pass must never remove
    pub fn protected_paths(&self) -> impl Iterator<Item = &str> {
        self.install
            .state_dirs
            .iter()
            .chain(self.install.skip_clean.iter())
            .map(String::as_str)
    }
}

/// Replace every `%(key)s` in `template` for which `lookup` has a value
fn expand<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find(")s") else {
            out.push_str(&rest[start..]);
            return out;
        };

        match lookup(&after[..end]) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name
    pub name: String,

    /// Package version
    pub version: String,

    /// Short description
    #[serde(default)]
    pub summary: Option<String>,

    /// License identifier (SPDX)
    #[serde(default)]
    pub license: Option<String>,

    /// Homepage URL (informational only)
    #[serde(default)]
    pub homepage: Option<String>,
}

/// Source archive section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Source archive URL
    ///
    /// Supports `%(version)s` substitution.
    pub archive: String,

    /// Checksum for the archive (`md5:...`, `sha256:...`, `sha512:...` or bare hex)
    pub checksum: String,

    /// Directory inside the archive to use as the source root
    #[serde(default)]
    pub extract_dir: Option<String>,
}

/// A patch to fetch and apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRef {
    /// Patch URL or local path
    pub url: String,

    /// Checksum of the patch content (optional)
    #[serde(default)]
    pub checksum: Option<String>,

    /// Leading path components to strip (default: 1)
    #[serde(default = "default_strip")]
    pub strip: usize,
}

impl PatchRef {
    /// Create a patch reference with the default strip level
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            checksum: None,
            strip: default_strip(),
        }
    }

    /// Pin the patch content to a checksum
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Whether the patch is fetched over the network
    pub fn is_remote(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

fn default_strip() -> usize {
    1
}

/// A literal find-and-replace in one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// File to edit, relative to the source root
    pub file: String,

    /// Exact text to find
    pub pattern: String,

    /// Replacement text; `%(prefix)s` expands to the install prefix
    pub replacement: String,
}

impl TextEdit {
    pub fn new(
        file: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// How an environment variable is changed for the build
///
/// In TOML: `CFLAGS = { append = "-I../include" }` or `CC = { set = "clang" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvOverride {
    /// Replace the variable outright
    Set(String),
    /// Append to the existing value, separated by a space
    Append(String),
}

/// Build instructions section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    /// Commands to run, in order
    #[serde(default)]
    pub steps: Vec<BuildStep>,

    /// Number of parallel jobs (`1` for packages that cannot build in parallel)
    #[serde(default)]
    pub jobs: Option<u32>,
}

/// One build command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// Program to run
    pub command: String,

    /// Arguments; `%(prefix)s` and recipe variables are substituted
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory relative to the source root
    #[serde(default)]
    pub workdir: Option<String>,
}

impl BuildStep {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            workdir: None,
        }
    }

    /// Run the step from a subdirectory of the source root
    pub fn in_dir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Human-readable command line for logs and errors
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Install layout section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallSection {
    /// Runtime state directories created under the prefix and never cleaned
    #[serde(default)]
    pub state_dirs: Vec<String>,

    /// Additional prefix-relative paths the clean pass must keep
    #[serde(default)]
    pub skip_clean: Vec<String>,

    /// Prefix-relative files created empty if absent
    #[serde(default)]
    pub touch: Vec<String>,

    /// Build outputs to copy into the prefix
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Prefix-relative paths removed by the clean pass
    #[serde(default)]
    pub clean: Vec<String>,
}

/// A build output to place in the install prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path or glob relative to the source root
    pub from: String,

    /// Destination directory relative to the install prefix
    #[serde(default = "default_artifact_dir")]
    pub to: String,
}

impl Artifact {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

fn default_artifact_dir() -> String {
    ".".to_string()
}
