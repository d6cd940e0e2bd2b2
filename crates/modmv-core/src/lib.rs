//! Rewrite engine behind `modmv`: parses Go files, rewrites import path literals and writes
//! the result back in place.

pub mod context;
pub mod gotool;
pub mod matcher;
pub mod quote;
pub mod strategy;
pub mod syntax;
pub mod walker;

pub use context::{Mode, RootContext};
pub use strategy::{ImportOnly, ModuleAndImport, RewriteOutcome, Rewriter};
pub use syntax::{GoFile, ImportSpec, PrintConfig, SyntaxError};
pub use walker::{FileOutcome, WalkOptions, WalkSummary};

/// File extension of the sources the walker visits.
pub const SOURCE_EXTENSION: &str = "go";
