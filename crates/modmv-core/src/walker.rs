//! Tree traversal and the per-file read → parse → rewrite → write transaction.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::{DirEntry, WalkBuilder};
use log::{debug, error, warn};

use crate::SOURCE_EXTENSION;
use crate::context::RootContext;
use crate::strategy::Rewriter;
use crate::syntax::{GoFile, SyntaxError};

/// Traversal knobs. The default visits every directory under the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Do not descend into `vendor/` directories.
    pub skip_vendor: bool,
    /// Honor `.gitignore`, `.ignore` and git exclude files.
    pub respect_ignore: bool,
}

/// What happened to a single file.
#[derive(Debug)]
pub enum FileOutcome {
    Unchanged,
    Rewritten,
    /// The file did not parse and was left alone.
    Skipped(SyntaxError),
    /// Dry run: the file would have been rewritten.
    WouldRewrite {
        original: Vec<u8>,
        rewritten: Vec<u8>,
    },
}

#[derive(Debug, Default)]
pub struct WalkSummary {
    pub visited: usize,
    pub rewritten: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl WalkSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub fn skip_vendor(entry: &DirEntry) -> bool {
    let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
    !(is_dir && entry.file_name() == "vendor")
}

fn is_go_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// Walk `root` and call `processor` for every `.go` file, in file name order.
///
/// Returns the number of files visited. Errors from the traversal itself or from `processor`
/// stop the walk.
pub fn walk_go_files<F>(root: &Path, options: &WalkOptions, mut processor: F) -> Result<usize>
where
    F: FnMut(&Path) -> Result<()>,
{
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(options.respect_ignore)
        .hidden(false)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b));
    if options.skip_vendor {
        builder.filter_entry(skip_vendor);
    }

    let mut found_files = 0;
    for result in builder.build() {
        let entry = result?;
        let path = entry.path();

        if path.is_file() && is_go_file(path) {
            processor(path)?;
            found_files += 1;
        }
    }

    Ok(found_files)
}

/// Collect `.go` file paths under `root`, sorted.
///
/// The whole list is gathered before any file is touched.
pub fn collect_go_files(root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>> {
    let mut go_files = Vec::new();
    walk_go_files(root, options, |path| {
        go_files.push(path.to_path_buf());
        Ok(())
    })?;
    go_files.sort();
    Ok(go_files)
}

/// Run the rewrite transaction for one file.
///
/// The file is read through a read-only handle. It is reopened for writing only when the
/// strategy produced bytes that differ from what is on disk, so files without a matching
/// import are never opened for write. The write truncates to the new length and writes from
/// offset zero into the same inode, keeping its permission bits. With `apply == false` nothing
/// is written and the would-be contents are returned instead.
pub fn rewrite_file(
    ctx: &RootContext,
    rewriter: &dyn Rewriter,
    path: &Path,
    apply: bool,
) -> Result<FileOutcome> {
    let mut source = Vec::new();
    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut source))
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut parsed = match GoFile::parse(source) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Skipping {}: {e}", path.display());
            return Ok(FileOutcome::Skipped(e));
        }
    };
    debug!(
        "{}: package {}, {} imports",
        path.display(),
        parsed.package_name(),
        parsed.imports().len()
    );

    let outcome = rewriter
        .rewrite(ctx, &mut parsed)
        .with_context(|| format!("Failed to rewrite {}", path.display()))?;

    let Some(rewritten) = outcome.into_bytes() else {
        return Ok(FileOutcome::Unchanged);
    };
    if rewritten == parsed.source() {
        return Ok(FileOutcome::Unchanged);
    }

    if !apply {
        return Ok(FileOutcome::WouldRewrite {
            original: parsed.source().to_vec(),
            rewritten,
        });
    }

    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    write_in_place(&mut file, &rewritten)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(FileOutcome::Rewritten)
}

fn write_in_place(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.set_len(bytes.len() as u64)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(bytes)?;
    file.flush()
}

/// Rewrite every `.go` file under the context root, one at a time.
///
/// Files that fail to parse are skipped; files that fail to print or write are logged and
/// recorded in [`WalkSummary::failed`]. Neither stops the walk. `on_file` sees every outcome
/// except failures.
pub fn walk<F>(
    ctx: &RootContext,
    options: &WalkOptions,
    apply: bool,
    mut on_file: F,
) -> Result<WalkSummary>
where
    F: FnMut(&Path, &FileOutcome),
{
    let rewriter = ctx.mode().rewriter();
    debug!(
        "Walking {} with {} ({} -> {})",
        ctx.root().display(),
        rewriter.name(),
        ctx.origin(),
        ctx.new_path()
    );

    let mut summary = WalkSummary::default();
    for path in collect_go_files(ctx.root(), options)? {
        let path = path.as_path();
        summary.visited += 1;
        match rewrite_file(ctx, rewriter, path, apply) {
            Ok(outcome) => {
                match &outcome {
                    FileOutcome::Rewritten | FileOutcome::WouldRewrite { .. } => {
                        summary.rewritten.push(path.to_path_buf())
                    }
                    FileOutcome::Skipped(_) => summary.skipped.push(path.to_path_buf()),
                    FileOutcome::Unchanged => {}
                }
                on_file(path, &outcome);
            }
            Err(e) => {
                error!("{e:#}");
                summary.failed.push(path.to_path_buf());
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use std::fs;

    const OLD: &str = "example.com/old";
    const NEW: &str = "example.com/new";
    const LONGER: &str = "example.com/much/longer/path";

    const MAIN_GO: &str = r#"package main

import (
	"fmt"

	"example.com/old"
	"example.com/old/sub"
)

func main() { fmt.Println(old.X, sub.Y) }
"#;

    fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn context(root: &Path, origin: &str, new_path: &str, mode: Mode) -> RootContext {
        RootContext::new(root, origin, new_path, mode).unwrap()
    }

    fn run(ctx: &RootContext, options: &WalkOptions) -> WalkSummary {
        walk(ctx, options, true, |_, _| {}).unwrap()
    }

    #[test]
    fn test_import_only_walk() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let main = write(temp.path(), "cmd/main.go", MAIN_GO);

        let ctx = context(temp.path(), OLD, NEW, Mode::ImportOnly);
        let summary = run(&ctx, &WalkOptions::default());

        assert_eq!(summary.visited, 1);
        assert_eq!(summary.rewritten, vec![main.clone()]);
        let updated = fs::read_to_string(&main)?;
        assert!(updated.contains("\t\"example.com/new\"\n"));
        assert!(updated.contains("\t\"example.com/old/sub\"\n"));
        Ok(())
    }

    #[test]
    fn test_module_walk_is_idempotent() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let main = write(temp.path(), "main.go", MAIN_GO);
        let lib = "package pkg\n\nimport \"example.com/old/pkg/internal\"\n";
        write(temp.path(), "pkg/lib.go", lib);

        let ctx = context(temp.path(), OLD, NEW, Mode::ModuleAndImport);
        let first = run(&ctx, &WalkOptions::default());
        assert_eq!(first.rewritten.len(), 2);
        let after_first = fs::read(&main)?;
        assert!(String::from_utf8_lossy(&after_first).contains("\"example.com/new/sub\""));

        let again = context(temp.path(), NEW, NEW, Mode::ModuleAndImport);
        let second = run(&again, &WalkOptions::default());
        assert!(second.rewritten.is_empty());
        assert_eq!(fs::read(&main)?, after_first);
        Ok(())
    }

    #[test]
    fn test_unmatched_and_non_go_files_untouched() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let untouched = write(temp.path(), "other.go", "package main\n\nimport \"fmt\"\n");
        let notes = write(temp.path(), "notes.txt", "import \"example.com/old\"\n");
        let manifest = write(temp.path(), "go.mod", "module example.com/old\n");
        let before = fs::metadata(&untouched)?.modified()?;

        let ctx = context(temp.path(), OLD, NEW, Mode::ModuleAndImport);
        let summary = run(&ctx, &WalkOptions::default());

        assert_eq!(summary.visited, 1);
        assert!(summary.rewritten.is_empty());
        assert_eq!(fs::metadata(&untouched)?.modified()?, before);
        assert_eq!(fs::read_to_string(&notes)?, "import \"example.com/old\"\n");
        assert_eq!(fs::read_to_string(&manifest)?, "module example.com/old\n");
        Ok(())
    }

    #[test]
    fn test_parse_failure_is_isolated() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let a = write(temp.path(), "a.go", "package a\n\nimport \"example.com/old\"\n");
        let broken_src = "package b\n\nimport (\n\t\"example.com/old\"\n\nfunc {{{\n";
        let broken = write(temp.path(), "b.go", broken_src);
        let c = write(temp.path(), "c.go", "package c\n\nimport \"example.com/old\"\n");

        let ctx = context(temp.path(), OLD, NEW, Mode::ImportOnly);
        let summary = run(&ctx, &WalkOptions::default());

        assert_eq!(summary.visited, 3);
        assert_eq!(summary.rewritten, vec![a.clone(), c.clone()]);
        assert_eq!(summary.skipped, vec![broken.clone()]);
        assert!(!summary.has_failures());
        assert_eq!(fs::read_to_string(&broken)?, broken_src);
        assert_eq!(fs::read_to_string(&c)?, "package c\n\nimport \"example.com/new\"\n");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_keeps_permissions() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir()?;
        let path = write(temp.path(), "main.go", "package main\n\nimport \"example.com/old\"\n");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640))?;

        let ctx = context(temp.path(), OLD, LONGER, Mode::ImportOnly);
        let summary = run(&ctx, &WalkOptions::default());

        assert_eq!(summary.rewritten.len(), 1);
        assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o640);
        assert_eq!(
            fs::read_to_string(&path)?,
            "package main\n\nimport \"example.com/much/longer/path\"\n"
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_unmatched_unwritable_file_is_not_a_failure() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let ro = write(temp.path(), "ro.go", "package ro\n\nimport \"fmt\"\n");
        let main = write(temp.path(), "main.go", "package main\n\nimport \"example.com/old\"\n");
        let Some(_lock) = modmv_test_utils::lock::lock_file(&ro) else {
            eprintln!("skipping: cannot make files unwritable here");
            return Ok(());
        };

        let ctx = context(temp.path(), OLD, NEW, Mode::ImportOnly);
        let summary = run(&ctx, &WalkOptions::default());

        assert!(!summary.has_failures(), "{:?}", summary.failed);
        assert_eq!(summary.visited, 2);
        assert_eq!(summary.rewritten, vec![main]);
        assert_eq!(fs::read_to_string(&ro)?, "package ro\n\nimport \"fmt\"\n");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_write_failure_is_recorded_and_walk_continues() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let src = "package p\n\nimport \"example.com/old\"\n";
        let a = write(temp.path(), "a.go", src);
        let locked = write(temp.path(), "b.go", src);
        let c = write(temp.path(), "c.go", src);
        let Some(_lock) = modmv_test_utils::lock::lock_file(&locked) else {
            eprintln!("skipping: cannot make files unwritable here");
            return Ok(());
        };

        let ctx = context(temp.path(), OLD, NEW, Mode::ImportOnly);
        let mut seen = Vec::new();
        let summary = walk(&ctx, &WalkOptions::default(), true, |path, _| {
            seen.push(path.to_path_buf());
        })?;

        assert_eq!(summary.visited, 3);
        assert_eq!(summary.failed, vec![locked.clone()]);
        assert_eq!(summary.rewritten, vec![a.clone(), c.clone()]);
        assert_eq!(seen, vec![a.clone(), c.clone()]);
        assert_eq!(fs::read_to_string(&locked)?, src);
        assert_eq!(fs::read_to_string(&c)?, src.replace("old", "new"));
        Ok(())
    }

    #[test]
    fn test_shorter_output_is_truncated() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let origin = "example.com/a/very/long/origin";
        let src = format!("package main\n\nimport \"{origin}\"\n");
        let path = write(temp.path(), "main.go", &src);

        let ctx = context(temp.path(), origin, "x.io/y", Mode::ImportOnly);
        run(&ctx, &WalkOptions::default());

        assert_eq!(fs::read_to_string(&path)?, "package main\n\nimport \"x.io/y\"\n");
        Ok(())
    }

    #[test]
    fn test_dry_run_does_not_write() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let src = "package main\n\nimport \"example.com/old\"\n";
        let path = write(temp.path(), "main.go", src);

        let ctx = context(temp.path(), OLD, NEW, Mode::ImportOnly);
        let mut previews = Vec::new();
        let summary = walk(&ctx, &WalkOptions::default(), false, |_, outcome| {
            if let FileOutcome::WouldRewrite { rewritten, .. } = outcome {
                previews.push(String::from_utf8_lossy(rewritten).into_owned());
            }
        })?;

        assert_eq!(summary.rewritten, vec![path.clone()]);
        assert_eq!(previews, vec![src.replace("old", "new")]);
        assert_eq!(fs::read_to_string(&path)?, src);
        Ok(())
    }

    #[test]
    fn test_walk_options_filter_directories() -> Result<()> {
        let temp = tempfile::tempdir()?;
        write(temp.path(), "main.go", "package main\n");
        write(temp.path(), "vendor/dep/dep.go", "package dep\n");
        write(temp.path(), "gen/out.go", "package gen\n");
        write(temp.path(), ".hidden/h.go", "package h\n");
        write(temp.path(), ".gitignore", "gen/\n");

        let all = collect_go_files(temp.path(), &WalkOptions::default())?;
        assert_eq!(all.len(), 4);

        let filtered = collect_go_files(
            temp.path(),
            &WalkOptions {
                skip_vendor: true,
                respect_ignore: true,
            },
        )?;
        assert_eq!(
            filtered,
            vec![temp.path().join(".hidden/h.go"), temp.path().join("main.go")]
        );
        Ok(())
    }
}
