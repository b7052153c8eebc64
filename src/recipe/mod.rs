// src/recipe/mod.rs

//! Recipe system for building packages from source
//!
//! A recipe pins everything needed to turn a source archive into an
//! installed package:
//! - The source archive and its checksum
//! - Patches to apply, in order
//! - Literal text edits that bake the install prefix into the source
//! - Environment overrides and build steps
//! - The install layout (artifacts, runtime state directories)
//!
//! # Culinary Terminology
//!
//! - **Recipe**: The build specification (like a recipe card)
//! - **Kitchen**: The executor that runs recipes
//! - **Cook**: One execution of a recipe, with its own build directory
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "nethack"
//! version = "3.4.3"
//!
//! [source]
//! archive = "http://downloads.sourceforge.net/project/nethack/nethack/3.4.3/nethack-343-src.tgz"
//! checksum = "md5:21479c95990eefe7650df582426457f9"
//!
//! [[edits]]
//! file = "include/config.h"
//! pattern = '#  define HACKDIR "/usr/games/lib/nethackdir"'
//! replacement = '#define HACKDIR "%(prefix)s"'
//!
//! [environment]
//! CFLAGS = { append = "-I../include" }
//!
//! [[build.steps]]
//! command = "make"
//! workdir = "src"
//!
//! [install]
//! state_dirs = ["save"]
//! ```

mod format;
pub mod kitchen;
pub mod parser;

pub use format::{
    Artifact, BuildSection, BuildStep, EnvOverride, InstallSection, PackageSection, PatchRef,
    Recipe, SourceSection, TextEdit, PREFIX_VAR,
};
pub use kitchen::{BuildContext, CancelToken, Cook, CookReport, Kitchen, KitchenConfig, Stage};
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
