//! Unwritable files for tests that exercise write failures.
//!
//! Clearing the write bits is enough for ordinary users. Root ignores mode bits, so when the
//! file is still writable afterwards the immutable attribute is tried (`chattr +i`). Tests
//! should skip themselves when [`lock_file`] returns `None`.

use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Keeps a file unwritable until dropped.
#[derive(Debug)]
pub struct LockedFile {
    path: PathBuf,
    immutable: bool,
}

impl LockedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_writable(path: &Path) -> bool {
    OpenOptions::new().write(true).open(path).is_ok()
}

fn chattr(flag: &str, path: &Path) -> bool {
    duct::cmd("chattr", [OsStr::new(flag), path.as_os_str()])
        .stdout_null()
        .stderr_null()
        .unchecked()
        .run()
        .is_ok_and(|out| out.status.success())
}

/// Make `path` unwritable for the current process, or return `None` if that is not possible.
#[cfg(unix)]
pub fn lock_file(path: &Path) -> Option<LockedFile> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o444)).ok()?;
    let mut locked = LockedFile {
        path: path.to_path_buf(),
        immutable: false,
    };
    if !is_writable(path) {
        return Some(locked);
    }

    locked.immutable = chattr("+i", path);
    if locked.immutable && !is_writable(path) {
        return Some(locked);
    }
    // Dropping restores the permissions
    None
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if self.immutable {
            chattr("-i", &self.path);
        }
        #[cfg(unix)]
        let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o644));
    }
}
