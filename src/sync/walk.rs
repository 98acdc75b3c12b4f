// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document enumeration.
//!
//! Walks a tree for markdown documents. Ignore files are not honoured, since
//! every synced document is ignored in the main tree. Symbolic links are
//! reported but never followed.

use crate::path::is_markdown;

use ignore::WalkBuilder;
use std::path::PathBuf;
use tracing::warn;

/// Dependency cache directories that never contain project documentation.
pub const CACHE_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    ".venv",
    "venv",
    "__pycache__",
    "bower_components",
    ".tox",
];

/// Markdown document found by a walk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WalkedDoc {
    /// Path relative to walk root.
    pub rel: PathBuf,

    /// Entry is a symbolic link rather than a regular file.
    pub is_symlink: bool,
}

/// Walker over markdown documents of a tree.
#[derive(Debug, Clone)]
pub struct DocWalker {
    root: PathBuf,
    pruned: Vec<PathBuf>,
}

impl DocWalker {
    /// Construct new walker rooted at path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pruned: Vec::new(),
        }
    }

    /// Never descend into directory at absolute path.
    pub fn prune(mut self, path: impl Into<PathBuf>) -> Self {
        self.pruned.push(path.into());
        self
    }

    /// Collect markdown documents in sorted order.
    ///
    /// Entries that cannot be read are logged and skipped.
    pub fn documents(&self) -> Vec<WalkedDoc> {
        let pruned = self.pruned.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().is_some_and(|kind| kind.is_dir());
                if !is_dir {
                    return true;
                }

                let name = entry.file_name().to_string_lossy();
                name != ".git"
                    && !CACHE_DIRS.contains(&&*name)
                    && !pruned.iter().any(|path| path == entry.path())
            });

        let mut docs = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(error) => {
                    warn!("skip unreadable entry: {error}");
                    continue;
                }
            };

            let Some(kind) = entry.file_type() else {
                continue;
            };
            if !(kind.is_file() || kind.is_symlink()) || !is_markdown(entry.path()) {
                continue;
            }

            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            docs.push(WalkedDoc {
                rel: rel.to_path_buf(),
                is_symlink: kind.is_symlink(),
            });
        }
        docs.sort();

        docs
    }
}
