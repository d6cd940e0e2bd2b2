use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::strategy::{ImportOnly, ModuleAndImport, Rewriter};

/// Which rewrite strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Rewrite imports that equal the origin path exactly.
    ImportOnly,
    /// Rewrite every import containing the origin path; `go.mod` is edited beforehand.
    ModuleAndImport,
}

impl Mode {
    pub fn rewriter(self) -> &'static dyn Rewriter {
        match self {
            Mode::ImportOnly => &ImportOnly,
            Mode::ModuleAndImport => &ModuleAndImport,
        }
    }
}

/// Everything a run needs to know, fixed before the walk starts.
#[derive(Debug, Clone)]
pub struct RootContext {
    root: PathBuf,
    origin: String,
    new_path: String,
    mode: Mode,
}

impl RootContext {
    pub fn new(
        root: impl Into<PathBuf>,
        origin: impl Into<String>,
        new_path: impl Into<String>,
        mode: Mode,
    ) -> Result<Self> {
        let origin = origin.into();
        let new_path = new_path.into();
        if origin.is_empty() {
            bail!("origin import path is empty");
        }
        if new_path.is_empty() {
            bail!("new import path is empty");
        }
        Ok(Self {
            root: root.into(),
            origin,
            new_path,
            mode,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn new_path(&self) -> &str {
        &self.new_path
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}
