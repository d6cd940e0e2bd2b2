use anyhow::Result;
use clap::Args;
use log::info;
use modmv_core::{Mode, RootContext};

use crate::report::{self, WalkArgs};

#[derive(Args, Debug, Clone)]
#[command(about = "Rewrite imports of one package path to another")]
pub struct RewriteArgs {
    /// Import path to replace. Only imports equal to it are rewritten.
    #[arg(value_name = "ORIGIN")]
    pub origin: String,

    /// Replacement import path
    #[arg(value_name = "NEW")]
    pub new_path: String,

    #[command(flatten)]
    pub walk: WalkArgs,
}

pub fn execute(args: RewriteArgs) -> Result<()> {
    let root = args.walk.resolve_root()?;
    info!("Rewriting {} -> {} under {}", args.origin, args.new_path, root.display());

    let ctx = RootContext::new(root, args.origin, args.new_path, Mode::ImportOnly)?;
    report::run_walk(&ctx, &args.walk)
}
