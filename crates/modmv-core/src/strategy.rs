//! The two rewrite strategies applied to each parsed file.

use log::debug;

use crate::context::RootContext;
use crate::matcher::MatchPolicy;
use crate::syntax::{GoFile, PrintConfig, SyntaxError};

/// Tab width used when module mode re-indents import blocks.
pub const MODULE_TAB_WIDTH: usize = 6;

/// Result of running a strategy over one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Unchanged,
    Modified(Vec<u8>),
}

impl RewriteOutcome {
    /// New file contents, if there is anything worth writing. Empty output counts as no change.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            RewriteOutcome::Modified(bytes) if !bytes.is_empty() => Some(bytes),
            _ => None,
        }
    }
}

pub trait Rewriter {
    fn name(&self) -> &'static str;

    /// Rewrite the file's imports in place and serialize it if anything changed.
    fn rewrite(
        &self,
        ctx: &RootContext,
        file: &mut GoFile,
    ) -> Result<RewriteOutcome, SyntaxError>;
}

/// Rewrite imports equal to the origin path; keep the file's layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOnly;

impl Rewriter for ImportOnly {
    fn name(&self) -> &'static str {
        "import-only"
    }

    fn rewrite(
        &self,
        ctx: &RootContext,
        file: &mut GoFile,
    ) -> Result<RewriteOutcome, SyntaxError> {
        rewrite_imports(ctx, file, MatchPolicy::Exact, &PrintConfig::default())
    }
}

/// Rewrite every import containing the origin path and print import blocks tab-indented.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleAndImport;

impl Rewriter for ModuleAndImport {
    fn name(&self) -> &'static str {
        "module-and-import"
    }

    fn rewrite(
        &self,
        ctx: &RootContext,
        file: &mut GoFile,
    ) -> Result<RewriteOutcome, SyntaxError> {
        rewrite_imports(
            ctx,
            file,
            MatchPolicy::Substring,
            &PrintConfig::tab_indented(MODULE_TAB_WIDTH),
        )
    }
}

fn rewrite_imports(
    ctx: &RootContext,
    file: &mut GoFile,
    policy: MatchPolicy,
    config: &PrintConfig,
) -> Result<RewriteOutcome, SyntaxError> {
    for spec in file.imports_mut() {
        if let Some(rewritten) = policy.rewrite(spec.path(), ctx.origin(), ctx.new_path()) {
            let before = spec.literal().to_string();
            spec.set_path(&rewritten);
            debug!(
                "line {}: {}{before} -> {}",
                spec.line(),
                spec.alias().map(|a| format!("{a} ")).unwrap_or_default(),
                spec.literal()
            );
        }
    }

    if !file.is_modified() {
        return Ok(RewriteOutcome::Unchanged);
    }
    Ok(RewriteOutcome::Modified(file.print(config)?))
}
