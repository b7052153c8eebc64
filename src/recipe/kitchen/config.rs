// src/recipe/kitchen/config.rs

//! Configuration and result types for the Kitchen

use super::cleanup::CleanReport;
use super::Stage;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Parent directory for per-attempt build directories
    pub work_dir: PathBuf,
    /// Number of parallel jobs (a recipe's `build.jobs` takes precedence)
    pub jobs: u32,
    /// Timeout for each build step, `None` for no limit
    pub build_timeout: Option<Duration>,
    /// Timeout for fetching sources and patches
    pub fetch_timeout: Duration,
    /// Start build steps from the caller's environment
    ///
    /// When false, build steps only see `PREFIX`, `MAKEFLAGS` and the recipe's
    /// own variables.
    pub inherit_env: bool,
    /// Keep build directory after completion (for debugging)
    pub keep_builddir: bool,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        Self {
            work_dir: std::env::temp_dir().join("conary-kitchen"),
            jobs,
            build_timeout: Some(Duration::from_secs(3600)), // 1 hour
            fetch_timeout: Duration::from_secs(300),
            inherit_env: true,
            keep_builddir: false,
        }
    }
}

impl KitchenConfig {
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_jobs(mut self, jobs: u32) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_build_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.build_timeout = timeout;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    pub fn with_keep_builddir(mut self, keep: bool) -> Self {
        self.keep_builddir = keep;
        self
    }
}

/// Result of cooking a recipe
#[derive(Debug, Default)]
pub struct CookReport {
    /// Stages completed, in order; ends with `Done`
    pub stages: Vec<Stage>,
    /// Files placed under the install prefix
    pub installed: Vec<PathBuf>,
    /// What the clean pass removed and kept
    pub clean: CleanReport,
    /// The per-attempt build directory (gone unless `keep_builddir`)
    pub build_dir: PathBuf,
    /// Build log
    pub log: String,
    /// Warnings generated during the build
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kitchen_config_default() {
        let config = KitchenConfig::default();
        assert!(config.jobs > 0);
        assert!(config.inherit_env);
        assert!(!config.keep_builddir);
        assert_eq!(config.build_timeout, Some(Duration::from_secs(3600)));
        assert!(config.work_dir.ends_with("conary-kitchen"));
    }

    #[test]
    fn test_kitchen_config_builders() {
        let config = KitchenConfig::default()
            .with_work_dir("/var/tmp/kitchen")
            .with_jobs(1)
            .with_build_timeout(None)
            .with_inherit_env(false)
            .with_keep_builddir(true);

        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/kitchen"));
        assert_eq!(config.jobs, 1);
        assert_eq!(config.build_timeout, None);
        assert!(!config.inherit_env);
        assert!(config.keep_builddir);
    }
}
