// src/lib.rs

//! Conary Kitchen
//!
//! Executes package build recipes: fetch a source archive, verify its
//! checksum, apply patches and literal source edits, build under a computed
//! environment, stage the results into an install prefix and clean up without
//! touching runtime state directories.
//!
//! # Architecture
//!
//! - Recipes are immutable values, parsed from TOML
//! - One Kitchen runs a fixed, strictly sequential pipeline per recipe
//! - Every failure is reported as the stage it happened in plus its cause
//! - Fetching and extraction sit behind traits so hosts can supply their own
//!
//! # Example
//!
//! ```ignore
//! use conary_kitchen::{parse_recipe_file, Kitchen, KitchenConfig};
//!
//! let recipe = parse_recipe_file(Path::new("nethack.toml"))?;
//! let kitchen = Kitchen::new(KitchenConfig::default())?;
//! let report = kitchen.execute(&recipe, Path::new("/opt/nethack/libexec"))?;
//! ```

mod error;
pub mod hash;
pub mod progress;
pub mod recipe;

pub use error::{Error, ErrorKind, ExecutionError, Result};
pub use hash::{hash_bytes, Hash, HashAlgorithm};
pub use progress::{CallbackProgress, LogProgress, ProgressEvent, ProgressTracker, SilentProgress};
pub use recipe::kitchen::{CleanupPolicy, Extractor, Fetcher, ProtectedPaths};
pub use recipe::{
    parse_recipe, parse_recipe_file, validate_recipe, BuildContext, CancelToken, Cook, CookReport,
    Kitchen, KitchenConfig, Recipe, Stage,
};
