// tests/nethack.rs

//! A complete recipe in the shape of a classic game package: an md5-pinned
//! tarball, a multi-file patch, a prefix baked into a header, appended
//! CFLAGS, a deparallelized per-directory build and a save directory that
//! must survive cleanup. Sources are read through the default fetcher from
//! local paths.

mod common;

use common::{read, tarball};
use conary_kitchen::hash::{hash_bytes, HashAlgorithm};
use conary_kitchen::{parse_recipe_file, validate_recipe, Kitchen, KitchenConfig, Stage};
use std::fs;
use std::path::Path;

const CONFIG_H: &str = "\
/* config.h */
#  define HACKDIR \"/usr/games/lib/nethackdir\"
#define COMPRESS \"/usr/bin/compress\"
";

const OSX_PATCH: &str = "\
From 82992eb6e4d8c76b05037579126293d644ef971d Mon Sep 17 00:00:00 2001
Subject: [PATCH] OS X build fixes

diff --git a/src/hack.c b/src/hack.c
index 1111111..2222222 100644
--- a/src/hack.c
+++ b/src/hack.c
@@ -1,2 +1,2 @@
 /* hack.c */
-int version = 342;
+int version = 343;
diff --git a/doc/README.osx b/doc/README.osx
new file mode 100644
--- /dev/null
+++ b/doc/README.osx
@@ -0,0 +1 @@
+Built for OS X
";

fn write_sources(dir: &Path) -> (String, String) {
    let archive = tarball(&[
        ("nethack-3.4.3/include/config.h", CONFIG_H),
        ("nethack-3.4.3/src/hack.c", "/* hack.c */\nint version = 342;\n"),
        ("nethack-3.4.3/dat/castle.des", "MAZE:\"castle\"\n"),
        ("nethack-3.4.3/dat/oracle.des", "LEVEL:\"oracle\"\n"),
        ("nethack-3.4.3/doc/nethack.6", ".TH NETHACK 6\n"),
    ]);
    fs::write(dir.join("nethack-3.4.3.tar.gz"), &archive).unwrap();
    fs::write(dir.join("nethack-osx-343.patch"), OSX_PATCH).unwrap();

    (
        hash_bytes(HashAlgorithm::Md5, &archive).to_prefixed_string(),
        hash_bytes(HashAlgorithm::Sha256, OSX_PATCH.as_bytes()).to_prefixed_string(),
    )
}

fn write_recipe(dir: &Path) -> std::path::PathBuf {
    let (archive_md5, patch_sha256) = write_sources(dir);
    let recipe = format!(
        r#"
[package]
name = "nethack"
version = "3.4.3"
summary = "Single-player roguelike video game"
license = "NGPL"
homepage = "http://www.nethack.org/index.html"

[source]
archive = "{dir}/nethack-%(version)s.tar.gz"
checksum = "{archive_md5}"

[[patches]]
url = "file://{dir}/nethack-osx-343.patch"
checksum = "{patch_sha256}"

[[edits]]
file = "include/config.h"
pattern = '#  define HACKDIR "/usr/games/lib/nethackdir"'
replacement = '#define HACKDIR "%(prefix)s"'

[environment]
CFLAGS = {{ append = "-I../include" }}

[build]
jobs = 1

[[build.steps]]
command = "sh"
args = ["-c", "printf '%s\n' \"$CFLAGS\" > cflags.txt && cp hack.c nethack"]
workdir = "src"

[[build.steps]]
command = "sh"
args = ["-c", "for f in *.des; do cp \"$f\" \"${{f%.des}}.lev\"; done"]
workdir = "dat"

[install]
state_dirs = ["save"]
touch = ["perm", "logfile"]
clean = ["save"]

[[install.artifacts]]
from = "src/nethack"

[[install.artifacts]]
from = "dat/*.lev"

[[install.artifacts]]
from = "src/cflags.txt"

[[install.artifacts]]
from = "include/config.h"
to = "include"

[[install.artifacts]]
from = "doc"
to = "share"
"#,
        dir = dir.display(),
    );

    let path = dir.join("nethack.toml");
    fs::write(&path, recipe).unwrap();
    path
}

#[test]
fn test_nethack_recipe_end_to_end() {
    let temp = tempfile::tempdir().unwrap();
    let recipe = parse_recipe_file(&write_recipe(temp.path())).unwrap();
    assert!(validate_recipe(&recipe).unwrap().is_empty());

    let prefix = temp.path().join("Cellar/nethack/3.4.3/libexec");
    let config = KitchenConfig::default().with_work_dir(temp.path().join("work"));
    let kitchen = Kitchen::new(config).unwrap();

    let report = kitchen.execute(&recipe, &prefix).unwrap();
    assert_eq!(report.stages.last(), Some(&Stage::Done));

    // Patched sources were built and installed
    assert_eq!(read(&prefix.join("nethack")), "/* hack.c */\nint version = 343;\n");
    assert_eq!(read(&prefix.join("share/doc/README.osx")), "Built for OS X\n");
    assert!(prefix.join("share/doc/nethack.6").exists());
    assert!(prefix.join("castle.lev").exists());
    assert!(prefix.join("oracle.lev").exists());

    // The prefix is baked into the header
    let header = read(&prefix.join("include/config.h"));
    assert!(header.contains(&format!("#define HACKDIR \"{}\"", prefix.display())));
    assert!(header.contains("#define COMPRESS"));

    // CFLAGS kept any inherited value and gained the include path
    let cflags = read(&prefix.join("cflags.txt"));
    assert!(cflags.trim_end().ends_with("-I../include"));

    // Runtime state survives the clean pass
    assert!(prefix.join("save").is_dir());
    assert_eq!(report.clean.skipped, vec![prefix.join("save")]);
    assert_eq!(read(&prefix.join("perm")), "");
    assert_eq!(read(&prefix.join("logfile")), "");
    assert!(!report.build_dir.exists());
}

#[test]
fn test_reinstall_keeps_saved_games() {
    let temp = tempfile::tempdir().unwrap();
    let recipe = parse_recipe_file(&write_recipe(temp.path())).unwrap();
    let prefix = temp.path().join("libexec");
    let config = KitchenConfig::default().with_work_dir(temp.path().join("work"));
    let kitchen = Kitchen::new(config).unwrap();

    kitchen.execute(&recipe, &prefix).unwrap();
    fs::write(prefix.join("save/501wizard.gz"), "saved game").unwrap();
    fs::write(prefix.join("logfile"), "3.4.3 1234 ...\n").unwrap();

    kitchen.execute(&recipe, &prefix).unwrap();

    assert_eq!(read(&prefix.join("save/501wizard.gz")), "saved game");
    assert_eq!(read(&prefix.join("logfile")), "3.4.3 1234 ...\n");
}
