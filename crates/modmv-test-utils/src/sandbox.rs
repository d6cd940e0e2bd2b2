//! sandbox.rs
//!
//! Hermetic test sandbox for running `modmv` against a throwaway Go source tree.
//! - The tree lives under an `assert_fs::TempDir` and is cleaned up on drop
//! - A scripted stand-in for the `go` command reads and edits `go.mod` without a Go toolchain
//! - Every invocation of the fake `go` is logged, together with a copy of the tree's `.go`
//!   files taken at the moment `go.mod` is edited
//!
//! ## Quick example
//! ```no_run
//! use modmv_test_utils::sandbox::Sandbox;
//!
//! let mut sb = Sandbox::new();
//! sb.write("go.mod", "module example.com/old\n")
//!     .write("main.go", "package main\n\nimport \"example.com/old/pkg\"\n")
//!     .with_fake_go();
//!
//! let output = sb.run(["module", "example.com/new"]);
//! assert!(output.status.success());
//! assert_eq!(sb.read("go.mod"), "module example.com/new\n");
//! ```

use assert_fs::TempDir;
use assert_fs::fixture::PathChild;
use duct::Expression;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

/// Script standing in for `go list -m -json` and `go mod edit -module`.
const FAKE_GO: &str = r#"#!/bin/sh
tools=$(dirname "$0")
echo "$*" >> "$tools/go.log"
if [ ! -f go.mod ]; then
    echo "go: cannot find main module" >&2
    exit 1
fi
case "$1 $2" in
"list -m")
    module=$(sed -n 's/^module[[:space:]]*//p' go.mod)
    printf '{\n\t"Path": "%s",\n\t"Main": true\n}\n' "$module"
    ;;
"mod edit")
    if [ "$3" != "-module" ] || [ -z "$4" ]; then
        echo "usage: go mod edit -module path" >&2
        exit 2
    fi
    find . -type f -name '*.go' | sort | while read -r f; do cat "$f"; done > "$tools/edit-snapshot.txt"
    sed "s|^module .*|module $4|" go.mod > go.mod.tmp && mv go.mod.tmp go.mod
    ;;
*)
    echo "unsupported: go $*" >&2
    exit 2
    ;;
esac
"#;

pub struct Sandbox {
    root: TempDir,
    tree: PathBuf,
    tools: PathBuf,
    fake_go: Option<PathBuf>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    /// Create a new sandbox; all state is under an auto-cleaned TempDir.
    pub fn new() -> Self {
        let root = TempDir::new().expect("create sandbox TempDir");
        let tree = root.child("tree").to_path_buf();
        let tools = root.child("tools").to_path_buf();

        fs::create_dir_all(&tree).expect("create tree dir");
        fs::create_dir_all(&tools).expect("create tools dir");

        Self {
            root,
            tree,
            tools,
            fake_go: None,
        }
    }

    /// Absolute path to the sandbox root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// The Go source tree commands run in.
    pub fn tree(&self) -> &Path {
        &self.tree
    }

    /// Write/overwrite a file relative to the source tree.
    pub fn write<P: AsRef<Path>, S: AsRef<[u8]>>(&mut self, rel: P, contents: S) -> &mut Self {
        let p = self.tree.join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(p, contents).expect("write file");
        self
    }

    /// Read a file relative to the source tree.
    pub fn read<P: AsRef<Path>>(&self, rel: P) -> String {
        fs::read_to_string(self.tree.join(rel)).expect("read file")
    }

    /// Install the scripted `go` and point `MODMV_GO` at it.
    #[cfg(unix)]
    pub fn with_fake_go(&mut self) -> &mut Self {
        use std::os::unix::fs::PermissionsExt;

        let path = self.tools.join("go");
        fs::write(&path, FAKE_GO).expect("write fake go");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake go");
        self.fake_go = Some(path);
        self
    }

    /// Make a file in the tree unwritable until the returned guard drops.
    #[cfg(unix)]
    pub fn lock<P: AsRef<Path>>(&self, rel: P) -> Option<crate::lock::LockedFile> {
        crate::lock::lock_file(&self.tree.join(rel))
    }

    /// Arguments the fake `go` was called with, one entry per call.
    pub fn go_calls(&self) -> Vec<String> {
        fs::read_to_string(self.tools.join("go.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Concatenated `.go` sources as they were when the fake `go` edited `go.mod`.
    pub fn edit_snapshot(&self) -> Option<String> {
        fs::read_to_string(self.tools.join("edit-snapshot.txt")).ok()
    }

    /// Build a `duct::Expression` for the `modmv` binary, run from the source tree.
    pub fn cmd<I>(&self, args: I) -> Expression
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        let bin = assert_cmd::cargo::cargo_bin("modmv");
        let args: Vec<_> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        let expr = duct::cmd(bin, args).dir(&self.tree);
        self.inject_env(expr)
    }

    /// Run `modmv`, capturing output without failing on a non-zero exit.
    pub fn run<I>(&self, args: I) -> Output
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        self.cmd(args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .expect("spawn modmv")
    }

    pub fn inject_env(&self, expr: Expression) -> Expression {
        let mut env_map: HashMap<String, String> = HashMap::new();
        if let Ok(path) = std::env::var("PATH") {
            env_map.insert("PATH".into(), path);
        }
        env_map.insert(
            "HOME".into(),
            self.root_path().to_string_lossy().into_owned(),
        );
        env_map.insert("NO_COLOR".into(), "1".into());
        if let Some(go) = &self.fake_go {
            env_map.insert("MODMV_GO".into(), go.to_string_lossy().into_owned());
        }
        expr.full_env(&env_map)
    }
}
