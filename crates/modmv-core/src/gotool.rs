//! Calls into the `go` command: discovering the module path and editing `go.mod`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::Deserialize;

/// Environment variable that overrides the `go` binary.
pub const GO_ENV: &str = "MODMV_GO";

/// Something that can run `go <args>` and hand back its stdout.
pub trait GoTool {
    fn run(&self, args: &[&str]) -> Result<Vec<u8>>;
}

/// Runs a real `go` binary as a subprocess inside the module directory.
#[derive(Debug, Clone)]
pub struct GoCommand {
    program: OsString,
    dir: PathBuf,
}

impl GoCommand {
    pub fn new(program: impl Into<OsString>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            dir: dir.into(),
        }
    }

    /// `go` from `PATH`, unless `MODMV_GO` names another binary.
    pub fn from_env(dir: impl Into<PathBuf>) -> Self {
        let program = std::env::var_os(GO_ENV).unwrap_or_else(|| OsString::from("go"));
        Self::new(program, dir)
    }
}

impl GoTool for GoCommand {
    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!("Running {:?} {:?} in {}", self.program, args, self.dir.display());
        let out = Command::new(&self.program)
            .args(args)
            .current_dir(&self.dir)
            .output()
            .with_context(|| format!("Failed to run {:?}", self.program))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let stdout = String::from_utf8_lossy(&out.stdout);
            bail!(
                "go {:?}: {}: {}{}",
                args,
                out.status,
                stderr.trim(),
                stdout.trim()
            );
        }
        Ok(out.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct ModuleInfo {
    #[serde(rename = "Path", default)]
    path: String,
}

/// Ask `go list -m -json` for the current module path.
///
/// In a workspace `go list` prints one JSON object per module; the first one is used.
pub fn discover_module_path(tool: &dyn GoTool) -> Result<String> {
    let out = tool.run(&["list", "-m", "-json"])?;
    let first = serde_json::Deserializer::from_slice(&out)
        .into_iter::<ModuleInfo>()
        .next()
        .transpose()
        .context("Failed to decode `go list -m -json` output")?;

    match first {
        Some(info) if !info.path.is_empty() => Ok(info.path),
        _ => bail!("could not find module path"),
    }
}

/// Rewrite the `module` directive of `go.mod` with `go mod edit -module`.
pub fn set_module_path(tool: &dyn GoTool, path: &str) -> Result<()> {
    tool.run(&["mod", "edit", "-module", path])
        .with_context(|| format!("Failed to set module path to {path}"))?;
    Ok(())
}

/// Discover the current module path and point `go.mod` at `new_path`.
///
/// Returns the previous module path, which becomes the origin for the import rewrite. When
/// `edit` is false (dry run) the manifest is left alone. Declaring the path the manifest
/// already has does not invoke the tool a second time.
pub fn move_module(tool: &dyn GoTool, new_path: &str, edit: bool) -> Result<String> {
    let origin = discover_module_path(tool)?;
    info!("Current module path: {origin}");

    if origin == new_path {
        info!("go.mod already declares {new_path}");
    } else if edit {
        set_module_path(tool, new_path)?;
        info!("Updated go.mod: {origin} -> {new_path}");
    }
    Ok(origin)
}
