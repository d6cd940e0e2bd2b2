use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use modmv_core::walker;
use modmv_core::{FileOutcome, RootContext, WalkOptions};
use similar::TextDiff;

/// Flags shared by every subcommand that walks a tree.
#[derive(Args, Debug, Default, Clone)]
pub struct WalkArgs {
    /// Root directory of the tree to rewrite. Defaults to the current directory.
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Show diffs instead of writing files
    #[arg(long)]
    pub diff: bool,

    /// Do not descend into vendor/ directories
    #[arg(long)]
    pub skip_vendor: bool,

    /// Skip files matched by .gitignore and .ignore
    #[arg(long)]
    pub respect_gitignore: bool,
}

impl WalkArgs {
    pub fn resolve_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to resolve working directory"),
        }
    }

    fn options(&self) -> WalkOptions {
        WalkOptions {
            skip_vendor: self.skip_vendor,
            respect_ignore: self.respect_gitignore,
        }
    }
}

fn display_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn unified_diff(name: &str, original: &[u8], rewritten: &[u8]) -> String {
    let original = String::from_utf8_lossy(original);
    let rewritten = String::from_utf8_lossy(rewritten);
    let diff = TextDiff::from_lines(original.as_ref(), rewritten.as_ref());
    format!(
        "{}",
        diff.unified_diff()
            .context_radius(3)
            .header(&format!("old/{name}"), &format!("new/{name}"))
    )
}

/// Walk the tree described by `ctx`, reporting each file as it is handled.
pub fn run_walk(ctx: &RootContext, args: &WalkArgs) -> Result<()> {
    let root = ctx.root();
    let summary = walker::walk(ctx, &args.options(), !args.diff, |path, outcome| {
        let name = display_name(root, path);
        match outcome {
            FileOutcome::Rewritten => {
                eprintln!("{} {}", "✓".green(), name.green().bold());
            }
            FileOutcome::WouldRewrite {
                original,
                rewritten,
            } => {
                print!("{}", unified_diff(&name, original, rewritten));
            }
            FileOutcome::Skipped(e) => {
                eprintln!("{} {}: {e}", "!".yellow(), name.yellow().bold());
            }
            FileOutcome::Unchanged => {}
        }
    })?;

    let verb = if args.diff { "would rewrite" } else { "rewrote" };
    eprintln!(
        "\n{verb} {} of {} .go files ({} skipped)",
        summary.rewritten.len(),
        summary.visited,
        summary.skipped.len()
    );

    if summary.has_failures() {
        for path in &summary.failed {
            eprintln!("{} {}", "✗".red(), display_name(root, path).red().bold());
        }
        anyhow::bail!("Failed to rewrite {} files", summary.failed.len());
    }

    Ok(())
}
