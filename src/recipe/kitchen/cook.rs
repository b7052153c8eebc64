// src/recipe/kitchen/cook.rs

//! Cook: one execution of a recipe
//!
//! A `Cook` owns the [`BuildContext`] of a single attempt and runs the
//! pipeline stages against it. The [`Kitchen`] decides the order and wraps
//! failures; each stage method here just does its work and returns
//! [`Error`] on failure.

use super::archive::find_source_root;
use super::cleanup::{self, CleanReport, CleanupPolicy, ProtectedPaths};
use super::edit::apply_edits;
use super::environment;
use super::patch::apply_patches;
use super::stager;
use super::verify::verify;
use super::{Kitchen, Stage};
use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Execution-scoped state of one attempt
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Root of the extracted (then patched and edited) source tree
    pub extracted_source_root: PathBuf,
    /// Where runtime files are placed
    pub install_prefix: PathBuf,
    /// Effective environment for build steps
    pub environment: BTreeMap<String, String>,
    /// Per-attempt working directory
    pub build_dir: PathBuf,
}

/// A single cook operation
pub struct Cook<'a> {
    pub(super) kitchen: &'a Kitchen,
    pub(super) recipe: &'a Recipe,
    pub(super) ctx: BuildContext,
    /// Source archive bytes, held between fetch and verification
    archive: Option<Vec<u8>>,
    pub(super) installed: Vec<PathBuf>,
    pub(super) clean: CleanReport,
    /// Build log accumulator
    pub(super) log: String,
    pub(super) warnings: Vec<String>,
}

impl<'a> Cook<'a> {
    pub(super) fn new(kitchen: &'a Kitchen, recipe: &'a Recipe, install_prefix: &Path) -> Self {
        let build_dir = kitchen.config.work_dir.join(format!(
            "{}-{}-{}",
            recipe.package.name,
            recipe.package.version,
            Uuid::new_v4()
        ));

        Self {
            kitchen,
            recipe,
            ctx: BuildContext {
                extracted_source_root: build_dir.join("source"),
                install_prefix: install_prefix.to_path_buf(),
                environment: BTreeMap::new(),
                build_dir,
            },
            archive: None,
            installed: Vec::new(),
            clean: CleanReport::default(),
            log: String::new(),
            warnings: Vec::new(),
        }
    }

    pub(super) fn run_stage(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Fetched => self.fetch(),
            Stage::Verified => self.verify_and_extract(),
            Stage::Patched => self.patch(),
            Stage::TextEdited => self.edit(),
            Stage::EnvPrepared => self.prepare_env(),
            Stage::Built => self.build(),
            Stage::Staged => self.stage(),
            Stage::Cleaned => self.clean(),
            Stage::Done => Ok(()),
        }
    }

    fn prefix_str(&self) -> String {
        self.ctx.install_prefix.to_string_lossy().into_owned()
    }

    /// Fetch the source archive into the build directory
    fn fetch(&mut self) -> Result<()> {
        let build_dir = &self.ctx.build_dir;
        fs::create_dir_all(build_dir).map_err(|e| Error::io(build_dir, e))?;

        let url = self.recipe.archive_url();
        info!("Fetching source: {}", url);
        let bytes = self.kitchen.fetcher.fetch(&url)?;

        let local = build_dir.join(self.recipe.archive_filename());
        fs::write(&local, &bytes).map_err(|e| Error::io(&local, e))?;

        self.log_line(&format!("Fetched source: {} ({} bytes)", url, bytes.len()));
        self.archive = Some(bytes);
        Ok(())
    }

    /// Check the archive against the recipe checksum, then unpack it
    fn verify_and_extract(&mut self) -> Result<()> {
        let bytes = self.archive.take().ok_or_else(|| Error::FetchError {
            url: self.recipe.archive_url(),
            reason: "source archive was not fetched".to_string(),
        })?;

        verify(&bytes, &self.recipe.source.checksum)?;
        self.log_line(&format!("Verified checksum {}", self.recipe.source.checksum));

        let extract_root = self.ctx.build_dir.join("source");
        fs::create_dir_all(&extract_root).map_err(|e| Error::io(&extract_root, e))?;
        self.kitchen
            .extractor
            .extract(&bytes, &self.recipe.archive_filename(), &extract_root)?;

        self.ctx.extracted_source_root = match &self.recipe.source.extract_dir {
            Some(dir) => extract_root.join(dir),
            None => find_source_root(&extract_root)?,
        };
        debug!("Source directory: {}", self.ctx.extracted_source_root.display());
        self.log_line(&format!(
            "Extracted source to {}",
            self.ctx.extracted_source_root.display()
        ));

        Ok(())
    }

    fn patch(&mut self) -> Result<()> {
        let progress = &self.kitchen.progress;
        let total = self.recipe.patches.len();
        apply_patches(
            &self.ctx.extracted_source_root,
            &self.recipe.patches,
            self.kitchen.fetcher.as_ref(),
            |index, patch| progress.set_message(&format!("patch {}/{}: {}", index, total, patch.url)),
        )?;
        for patch in &self.recipe.patches {
            self.log.push_str(&format!("Applied patch: {}\n", patch.url));
        }
        Ok(())
    }

    fn edit(&mut self) -> Result<()> {
        let prefix = self.prefix_str();
        let recipe = self.recipe;
        apply_edits(&self.ctx.extracted_source_root, &recipe.edits, |template| {
            recipe.substitute(template, &prefix)
        })?;
        for edit in &recipe.edits {
            self.log.push_str(&format!("Edited {}\n", edit.file));
        }
        Ok(())
    }

    /// Compute the build environment
    ///
    /// Base: the caller's environment (if inherited), plus `PREFIX` and
    /// `MAKEFLAGS`. The recipe's overrides apply on top.
    fn prepare_env(&mut self) -> Result<()> {
        let mut base: BTreeMap<String, String> = if self.kitchen.config.inherit_env {
            std::env::vars().collect()
        } else {
            BTreeMap::new()
        };

        let jobs = self.recipe.build.jobs.unwrap_or(self.kitchen.config.jobs);
        base.insert("PREFIX".to_string(), self.prefix_str());
        base.insert("MAKEFLAGS".to_string(), format!("-j{}", jobs));

        self.ctx.environment = environment::prepare(&base, &self.recipe.environment);
        debug!("Build environment has {} variables", self.ctx.environment.len());
        Ok(())
    }

    /// Run every build step in order; the first failure stops the build
    fn build(&mut self) -> Result<()> {
        let logs = self.ctx.build_dir.join("logs");
        fs::create_dir_all(&logs).map_err(|e| Error::io(&logs, e))?;
        let prefix = self.prefix_str();
        let recipe = self.recipe;

        for (i, step) in recipe.build.steps.iter().enumerate() {
            let command = recipe.substitute(&step.command, &prefix);
            let args: Vec<String> = step
                .args
                .iter()
                .map(|arg| recipe.substitute(arg, &prefix))
                .collect();
            let cwd = match &step.workdir {
                Some(dir) => self.ctx.extracted_source_root.join(dir),
                None => self.ctx.extracted_source_root.clone(),
            };
            let log_path = logs.join(format!("step-{:02}.log", i + 1));
            self.kitchen.progress.set_message(&format!(
                "step {}/{}: {}",
                i + 1,
                recipe.build.steps.len(),
                step.display()
            ));

            let result = environment::run(
                &command,
                &args,
                &self.ctx.environment,
                &cwd,
                self.kitchen.config.build_timeout,
                &log_path,
            );
            self.log_step_output(&step.display(), &log_path);
            result?;
        }

        Ok(())
    }

    /// Create state directories, touch files and install artifacts
    fn stage(&mut self) -> Result<()> {
        let prefix = self.ctx.install_prefix.clone();
        stager::ensure_directory(&prefix)?;

        for artifact in &self.recipe.install.artifacts {
            let placed = stager::install(&self.ctx.extracted_source_root, &prefix, artifact)?;
            self.installed.extend(placed);
        }

        for dir in &self.recipe.install.state_dirs {
            stager::ensure_directory(&prefix.join(dir))?;
            self.log.push_str(&format!("Created state directory {}\n", dir));
        }

        for file in &self.recipe.install.touch {
            let path = prefix.join(file);
            stager::touch(&path)?;
            self.installed.push(path);
        }

        info!(
            "Staged {} file(s) into {}",
            self.installed.len(),
            prefix.display()
        );
        Ok(())
    }

    /// Remove leftovers, empty directories and the build directory
    fn clean(&mut self) -> Result<()> {
        let prefix = &self.ctx.install_prefix;
        let recipe_policy;
        let policy: &dyn CleanupPolicy = match &self.kitchen.cleanup_policy {
            Some(policy) => policy.as_ref(),
            None => {
                recipe_policy = ProtectedPaths::from_recipe(self.recipe);
                &recipe_policy
            }
        };

        let mut candidates: Vec<PathBuf> = self
            .recipe
            .install
            .clean
            .iter()
            .map(|path| prefix.join(path))
            .collect();
        if !self.kitchen.config.keep_builddir {
            candidates.push(self.ctx.build_dir.clone());
        }

        let mut report = cleanup::clean(&candidates, prefix, policy)?;
        report.merge(cleanup::prune_empty_dirs(prefix, policy)?);

        for skipped in &report.skipped {
            self.warnings
                .push(format!("Kept protected path {}", skipped.display()));
        }
        self.clean = report;
        Ok(())
    }

    fn log_line(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    /// Append a step's captured output to the build log
    fn log_step_output(&mut self, step: &str, log_path: &Path) {
        self.log_line(&format!("=== {} ===", step));
        if let Ok(output) = fs::read_to_string(log_path)
            && !output.is_empty()
        {
            self.log.push_str(&output);
            if !output.ends_with('\n') {
                self.log.push('\n');
            }
        }
    }
}
