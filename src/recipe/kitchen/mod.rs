// src/recipe/kitchen/mod.rs

//! Kitchen: executes recipes
//!
//! The Kitchen takes a [`Recipe`] through a fixed pipeline:
//!
//! ```text
//! Fetched -> Verified -> Patched -> TextEdited -> EnvPrepared -> Built -> Staged -> Cleaned -> Done
//! ```
//!
//! Stages run strictly in order, each on the filesystem state left by the
//! previous one. The first failure stops the pipeline and is reported as an
//! [`ExecutionError`] naming the stage that was being entered. Nothing is
//! retried or rolled back: a fresh attempt starts from a fresh fetch in its
//! own build directory.
//!
//! Several executions may share one Kitchen concurrently as long as they
//! install into different prefixes.

mod archive;
pub mod cleanup;
mod config;
mod cook;
pub mod edit;
pub mod environment;
pub mod patch;
pub mod stager;
pub mod verify;

pub use archive::{find_source_root, ArchiveFormat, Extractor, Fetcher, HttpFetcher, TarExtractor};
pub use cleanup::{CleanReport, CleanupPolicy, ProtectedPaths};
pub use config::{CookReport, KitchenConfig};
pub use cook::{BuildContext, Cook};

use crate::error::{Error, ExecutionError, Result};
use crate::progress::{ProgressTracker, SilentProgress};
use crate::recipe::format::Recipe;
use crate::recipe::parser::validate_recipe;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{info, warn};

/// Pipeline stages, in execution order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Fetched,
    Verified,
    Patched,
    TextEdited,
    EnvPrepared,
    Built,
    Staged,
    Cleaned,
    Done,
}

impl Stage {
    /// Every stage, in the order the Kitchen runs them
    pub const PIPELINE: [Stage; 9] = [
        Stage::Fetched,
        Stage::Verified,
        Stage::Patched,
        Stage::TextEdited,
        Stage::EnvPrepared,
        Stage::Built,
        Stage::Staged,
        Stage::Cleaned,
        Stage::Done,
    ];

    /// The stage after this one, `None` for `Done`
    pub fn next(self) -> Option<Stage> {
        Self::PIPELINE
            .iter()
            .position(|s| *s == self)
            .and_then(|i| Self::PIPELINE.get(i + 1).copied())
    }
}

/// Shared cancellation flag
///
/// Clones share the flag. Cancelling stops every execution using the token
/// before its next stage; the stage in progress runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The Kitchen: where recipes are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    progress: Arc<dyn ProgressTracker>,
    /// Overrides the recipe's own protected paths when set
    cleanup_policy: Option<Arc<dyn CleanupPolicy>>,
    cancel: CancelToken,
}

impl Kitchen {
    /// Create a Kitchen using the default HTTP fetcher and tar extractor
    pub fn new(config: KitchenConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)?;

        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(TarExtractor),
            progress: Arc::new(SilentProgress::new()),
            cleanup_policy: None,
            cancel: CancelToken::new(),
        })
    }

    /// Create a Kitchen with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(KitchenConfig::default())
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cleanup_policy(mut self, policy: Arc<dyn CleanupPolicy>) -> Self {
        self.cleanup_policy = Some(policy);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// Token that cancels this Kitchen's executions
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Cook a recipe into `install_prefix`
    ///
    /// This is the main entry point. On success every stage up to `Done` has
    /// run. On failure the error names the stage being entered and the
    /// underlying cause; the build directory is left behind for inspection.
    pub fn execute(
        &self,
        recipe: &Recipe,
        install_prefix: &Path,
    ) -> std::result::Result<CookReport, ExecutionError> {
        info!(
            "Cooking {} version {} into {}",
            recipe.package.name,
            recipe.package.version,
            install_prefix.display()
        );

        let result = self.run_pipeline(recipe, install_prefix);
        match &result {
            Ok(report) => {
                info!(
                    "Cooked {}-{} ({} files)",
                    recipe.package.name,
                    recipe.package.version,
                    report.installed.len()
                );
                self.progress.finish_with_message(&format!(
                    "{}-{} done",
                    recipe.package.name, recipe.package.version
                ));
            }
            Err(e) => {
                warn!("Cooking {} failed: {}", recipe.package.name, e);
                self.progress.finish_with_error(&e.to_string());
            }
        }

        result
    }

    fn run_pipeline(
        &self,
        recipe: &Recipe,
        install_prefix: &Path,
    ) -> std::result::Result<CookReport, ExecutionError> {
        let warnings =
            validate_recipe(recipe).map_err(|e| ExecutionError::new(Stage::Fetched, e))?;
        for warning in &warnings {
            warn!("{}: {}", recipe.package.name, warning);
        }

        let mut cook = Cook::new(self, recipe, install_prefix);
        cook.warnings.extend(warnings);
        let mut completed = Vec::with_capacity(Stage::PIPELINE.len());

        for stage in Stage::PIPELINE {
            if self.cancel.is_cancelled() {
                info!("Cancelled before {}", stage);
                return Err(ExecutionError::new(stage, Error::Cancelled));
            }

            self.progress.stage_started(stage);
            cook.run_stage(stage)
                .map_err(|e| ExecutionError::new(stage, e))?;
            self.progress.stage_completed(stage);
            completed.push(stage);
        }

        Ok(CookReport {
            stages: completed,
            installed: cook.installed,
            clean: cook.clean,
            build_dir: cook.ctx.build_dir,
            log: cook.log,
            warnings: cook.warnings,
        })
    }
}
