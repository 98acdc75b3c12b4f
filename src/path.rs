// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Lexical helpers for working out where documents live, and how a link in
//! the main tree should point back into the side tree. Nothing here touches
//! the file system except [`unique_backup_path`].

use std::{
    ffi::OsString,
    path::{Component, Path, PathBuf},
};

/// File name of the overview document that never leaves the main tree root.
pub const ROOT_README: &str = "README.md";

/// Check if path names a markdown document.
pub fn is_markdown(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Lexically normalize a path.
///
/// Drops `.` components and folds `..` into its parent. Does not resolve
/// symbolic links, and does not check if the path exists.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}

/// Determine path of `target` relative to directory `from_dir`.
///
/// Both paths are expected to be absolute, or both relative to the same
/// base. This is what a relative symbolic link at `from_dir/<name>` must
/// contain to resolve to `target`.
pub fn relative_path(from_dir: impl AsRef<Path>, target: impl AsRef<Path>) -> PathBuf {
    let from = normalize(from_dir);
    let target = normalize(target);
    let from = from.components().collect::<Vec<_>>();
    let target = target.components().collect::<Vec<_>>();

    let shared = from
        .iter()
        .zip(target.iter())
        .take_while(|(lhs, rhs)| lhs == rhs)
        .count();

    let mut out = PathBuf::new();
    for _ in shared..from.len() {
        out.push("..");
    }
    for component in &target[shared..] {
        out.push(component.as_os_str());
    }

    out
}

/// Determine path `path` resolves to when read as link content placed at
/// `link`.
pub fn resolve_link_target(link: impl AsRef<Path>, content: impl AsRef<Path>) -> PathBuf {
    let content = content.as_ref();
    if content.is_absolute() {
        return normalize(content);
    }

    let parent = link.as_ref().parent().unwrap_or_else(|| Path::new(""));
    normalize(parent.join(content))
}

/// Append suffix to the file name of a path.
///
/// `a/README.md` with suffix `.bak` becomes `a/README.md.bak`.
pub fn with_suffix(path: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let path = path.as_ref();
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(suffix);
    path.with_file_name(name)
}

/// Determine a backup path for a file that does not clobber anything.
///
/// Tries `<path><suffix>` first, then `<path><suffix>.1`, `<path><suffix>.2`,
/// and so on until a free name is found.
pub fn unique_backup_path(path: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let candidate = with_suffix(path.as_ref(), suffix);
    if candidate.symlink_metadata().is_err() {
        return candidate;
    }

    let mut count = 1usize;
    loop {
        let candidate = with_suffix(path.as_ref(), &format!("{suffix}.{count}"));
        if candidate.symlink_metadata().is_err() {
            return candidate;
        }
        count += 1;
    }
}

/// Render relative path with forward slashes for ignore-style files.
pub fn to_slash(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
