// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File system mutations.
//!
//! Every change oxidoc makes to either tree goes through [`FileOps`]. In dry
//! run mode each operation only logs what it would have done.

use crate::path::resolve_link_target;

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Dry-run aware file system operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOps {
    dry_run: bool,
}

impl FileOps {
    /// Construct new file operations.
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Check if operations are only reported.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Create missing parent directories of path.
    pub fn create_parent(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        if parent.is_dir() {
            return Ok(());
        }

        if self.dry_run {
            info!("would create directory {:?}", parent.display());
            return Ok(());
        }

        debug!("create directory {:?}", parent.display());
        mkdirp::mkdirp(parent).map_err(|err| FsError::new("create directory", parent, err))?;
        Ok(())
    }

    /// Move file, creating parent directories of destination.
    ///
    /// Falls back to copy and remove only when source and destination live on
    /// different file systems.
    pub fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        self.create_parent(to)?;
        if self.dry_run {
            info!("would move {:?} to {:?}", from.display(), to.display());
            return Ok(());
        }

        info!("move {:?} to {:?}", from.display(), to.display());
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if is_cross_device(&err) => {
                debug!("{:?} crosses file systems, copy instead", to.display());
                fs::copy(from, to).map_err(|err| FsError::new("copy", from, err))?;
                fs::remove_file(from).map_err(|err| FsError::new("remove", from, err))
            }
            Err(err) => Err(FsError::new("move", from, err)),
        }
    }

    /// Rename file in place.
    pub fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if self.dry_run {
            info!("would rename {:?} to {:?}", from.display(), to.display());
            return Ok(());
        }

        info!("rename {:?} to {:?}", from.display(), to.display());
        fs::rename(from, to).map_err(|err| FsError::new("rename", from, err))
    }

    /// Copy file content, overwriting destination.
    pub fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        if self.dry_run {
            info!("would copy {:?} to {:?}", from.display(), to.display());
            return Ok(());
        }

        info!("copy {:?} to {:?}", from.display(), to.display());
        fs::copy(from, to).map_err(|err| FsError::new("copy", from, err))?;
        Ok(())
    }

    /// Remove file or symbolic link.
    pub fn remove_file(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            info!("would remove {:?}", path.display());
            return Ok(());
        }

        info!("remove {:?}", path.display());
        fs::remove_file(path).map_err(|err| FsError::new("remove", path, err))
    }

    /// Create symbolic link at `link` with content `target`.
    pub fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        self.create_parent(link)?;
        if self.dry_run {
            info!("would link {:?} -> {:?}", link.display(), target.display());
            return Ok(());
        }

        info!("link {:?} -> {:?}", link.display(), target.display());
        make_symlink(target, link).map_err(|err| FsError::new("link", link, err))
    }
}

/// Check if path is a symbolic link, without following it.
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

/// Check if path is a regular file, without following links.
pub fn is_regular_file(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|meta| meta.file_type().is_file())
        .unwrap_or(false)
}

/// Check if path exists at all, without following links.
pub fn exists_no_follow(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Check if symbolic link at `link` lands on the regular file at `target`.
///
/// Links spelled through a different path still count, as long as both
/// resolve to the same file.
pub fn link_resolves_to(link: &Path, target: &Path) -> bool {
    let Ok(content) = fs::read_link(link) else {
        return false;
    };

    if resolve_link_target(link, content) == target {
        return is_regular_file(target);
    }

    match (link.canonicalize(), target.canonicalize()) {
        (Ok(lhs), Ok(rhs)) => lhs == rhs && rhs.is_file(),
        _ => false,
    }
}

// INVARIANT: `ErrorKind::CrossesDevices` is newer than the supported toolchain.
#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    const EXDEV: i32 = 18;
    err.raw_os_error() == Some(EXDEV)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    const ERROR_NOT_SAME_DEVICE: i32 = 17;
    err.raw_os_error() == Some(ERROR_NOT_SAME_DEVICE)
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Single file system operation failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to {action} {:?}", path.display())]
pub struct FsError {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl FsError {
    fn new(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path the failed operation was applied to.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

/// Friendly result alias :3
pub type Result<T, E = FsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test]
    fn dry_run_touches_nothing() -> anyhow::Result<()> {
        fs::write("a.md", "x")?;
        let ops = FileOps::new(true);

        ops.move_file(Path::new("a.md"), Path::new("deep/dir/a.md"))?;
        ops.symlink(Path::new("a.md"), Path::new("other/b.md"))?;
        ops.remove_file(Path::new("a.md"))?;

        assert_eq!(fs::read_to_string("a.md")?, "x");
        assert!(!Path::new("deep").exists());
        assert!(!Path::new("other").exists());

        Ok(())
    }

    #[sealed_test]
    fn move_and_link() -> anyhow::Result<()> {
        fs::write("a.md", "x")?;
        let ops = FileOps::new(false);

        ops.move_file(Path::new("a.md"), Path::new("side/nested/a.md"))?;
        assert!(!exists_no_follow(Path::new("a.md")));
        assert!(is_regular_file(Path::new("side/nested/a.md")));

        ops.symlink(Path::new("side/nested/a.md"), Path::new("a.md"))?;
        assert!(is_symlink(Path::new("a.md")));
        assert_eq!(fs::read_to_string("a.md")?, "x");

        let cwd = std::env::current_dir()?;
        assert!(link_resolves_to(&cwd.join("a.md"), &cwd.join("side/nested/a.md")));
        assert!(!link_resolves_to(&cwd.join("a.md"), &cwd.join("other.md")));
        assert!(!link_resolves_to(&cwd.join("side/nested/a.md"), &cwd.join("a.md")));

        let result = ops.remove_file(Path::new("missing.md"));
        assert!(matches!(result, Err(err) if err.path() == Path::new("missing.md")));

        Ok(())
    }

    #[sealed_test]
    fn failed_move_reports_rename_error() -> anyhow::Result<()> {
        fs::write("a.md", "x")?;
        fs::write("blocked", "not a directory")?;
        let ops = FileOps::new(false);

        let result = ops.move_file(Path::new("a.md"), Path::new("blocked/a.md"));
        let err = match result {
            Err(err) => err,
            Ok(()) => anyhow::bail!("move into a regular file should fail"),
        };
        assert!(err.to_string().starts_with("failed to move"), "{err}");
        assert_eq!(err.path(), Path::new("a.md"));
        assert_eq!(fs::read_to_string("a.md")?, "x");

        Ok(())
    }
}
