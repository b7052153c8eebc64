// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use conary_kitchen::hash::{hash_bytes, HashAlgorithm};
use conary_kitchen::progress::{CallbackProgress, ProgressEvent};
use conary_kitchen::recipe::{BuildStep, PatchRef, Recipe, TextEdit};
use conary_kitchen::{Error, Fetcher, Kitchen, KitchenConfig, Result, Stage};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const SOURCE_URL: &str = "https://example.org/hello-1.0.tar.gz";

/// In-memory fetcher that records every URL it is asked for.
#[derive(Default)]
pub struct MapFetcher {
    content: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, content: impl Into<Vec<u8>>) -> Self {
        self.content.insert(url.to_string(), content.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        self.content.get(url).cloned().ok_or_else(|| Error::FetchError {
            url: url.to_string(),
            reason: "404 Not Found".to_string(),
        })
    }
}

/// Build a gzip-compressed tarball from (path, content) pairs.
pub fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    let tar = builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

pub fn sha256_of(data: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Sha256, data).to_prefixed_string()
}

/// A small C-like source tree with a path constant to edit.
pub fn hello_source() -> Vec<u8> {
    tarball(&[
        (
            "hello-1.0/include/config.h",
            "#define DATADIR \"/usr/share/hello\"\n",
        ),
        ("hello-1.0/src/hello.c", "int answer = 41;\n"),
        ("hello-1.0/Makefile", "all:\n\tcc -o hello src/hello.c\n"),
    ])
}

/// Recipe over [`hello_source`] with one edit and one successful build step.
pub fn hello_recipe(archive: &[u8]) -> Recipe {
    let mut recipe = conary_kitchen::parse_recipe(&format!(
        r#"
[package]
name = "hello"
version = "1.0"
summary = "Test package"
license = "MIT"
homepage = "https://example.org/hello"

[source]
archive = "{SOURCE_URL}"
checksum = "{}"
"#,
        sha256_of(archive)
    ))
    .unwrap();

    recipe.edits.push(TextEdit::new(
        "include/config.h",
        "/usr/share/hello",
        "%(prefix)s/share",
    ));
    recipe.build.steps.push(BuildStep::new(
        "sh",
        ["-c", "grep -q \"$PREFIX/share\" include/config.h && echo built > hello.out"],
    ));
    recipe
}

pub fn patch_ref(url: &str, content: &str) -> PatchRef {
    PatchRef::new(url).with_checksum(sha256_of(content.as_bytes()))
}

/// Scratch space: a work dir for build directories and an install prefix.
pub struct Scratch {
    pub dir: TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn work_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("work")
    }

    pub fn prefix(&self) -> std::path::PathBuf {
        self.dir.path().join("prefix")
    }

    pub fn config(&self) -> KitchenConfig {
        KitchenConfig::default()
            .with_work_dir(self.work_dir())
            .with_jobs(1)
    }
}

/// Records the stages a Kitchen started.
pub type StageLog = Arc<Mutex<Vec<Stage>>>;

pub fn kitchen(scratch: &Scratch, fetcher: Arc<MapFetcher>) -> (Kitchen, StageLog) {
    let started: StageLog = Arc::new(Mutex::new(Vec::new()));
    let sink = started.clone();
    let progress = CallbackProgress::new(move |event| {
        if let ProgressEvent::StageStarted(stage) = event {
            sink.lock().unwrap().push(stage);
        }
    });

    let kitchen = Kitchen::new(scratch.config())
        .unwrap()
        .with_fetcher(fetcher)
        .with_progress(Arc::new(progress));
    (kitchen, started)
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
