use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use modmv_core::gotool::{self, GoCommand};
use modmv_core::{Mode, RootContext};

use crate::report::{self, WalkArgs};

#[derive(Args, Debug, Clone)]
#[command(about = "Change the module path in go.mod and every import under it")]
pub struct ModuleArgs {
    /// New module path
    #[arg(value_name = "NEW")]
    pub new_path: String,

    /// go binary used to read and edit go.mod (also settable with MODMV_GO)
    #[arg(long, value_name = "PATH", value_hint = clap::ValueHint::ExecutablePath)]
    pub go: Option<PathBuf>,

    #[command(flatten)]
    pub walk: WalkArgs,
}

pub fn execute(args: ModuleArgs) -> Result<()> {
    let root = args.walk.resolve_root()?;
    let go = match &args.go {
        Some(program) => GoCommand::new(program, &root),
        None => GoCommand::from_env(&root),
    };

    // go.mod must carry the new path before any import is touched
    let origin = gotool::move_module(&go, &args.new_path, !args.walk.diff)?;

    let ctx = RootContext::new(root, origin, args.new_path, Mode::ModuleAndImport)?;
    report::run_walk(&ctx, &args.walk)
}
