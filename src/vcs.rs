// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control capabilities.
//!
//! The reconciliation logic never talks to Git directly. Instead it asks a
//! [`VcsClient`] the handful of questions it actually needs answered: where
//! the main tree lives, which branches and worktrees exist, and what the
//! status of a tree looks like. [`Git2Client`] answers them through libgit2.
//! [`MemoryVcs`] answers them from plain data so tests do not need a real
//! repository.

use git2::{BranchType, ErrorCode, Repository, Status, StatusOptions};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Registered worktree of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    /// Absolute path to the worktree.
    pub path: PathBuf,

    /// Branch checked out in the worktree, if any.
    pub branch: Option<String>,
}

/// State of a single path reported by [`VcsClient::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    New,
    Modified,
    Deleted,
    Renamed,
    Typechange,
    Conflicted,
}

/// Single status entry of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the tree root.
    pub path: PathBuf,

    /// What happened to the path.
    pub state: FileState,
}

/// Narrow view of a version-control backend.
pub trait VcsClient {
    /// Absolute path to the main working tree.
    fn work_dir(&self) -> Result<PathBuf>;

    /// Absolute path to the common git directory shared by every worktree.
    fn common_dir(&self) -> PathBuf;

    /// Check if a local branch exists.
    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// List registered linked worktrees.
    fn worktrees(&self) -> Result<Vec<WorktreeInfo>>;

    /// Check if path is a registered, valid linked worktree.
    fn worktree_exists(&self, path: &Path) -> Result<bool> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Ok(self.worktrees()?.into_iter().any(|info| {
            info.path.canonicalize().unwrap_or(info.path) == path
        }))
    }

    /// List uncommitted changes of tree rooted at path.
    fn status(&self, tree: &Path) -> Result<Vec<StatusEntry>>;
}

/// Version control through libgit2.
pub struct Git2Client {
    repository: Repository,
}

impl Git2Client {
    /// Discover repository containing path.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError::NotARepository`] if path is not inside a Git
    ///   repository.
    #[instrument(skip(path), level = "debug")]
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        debug!("discover repository from {:?}", path.as_ref().display());
        let repository = Repository::discover(path.as_ref()).map_err(|source| {
            VcsError::NotARepository {
                source,
                path: path.as_ref().to_path_buf(),
            }
        })?;

        // INVARIANT: Discovery from inside a linked worktree still targets the main tree.
        let repository = if repository.is_worktree() {
            Repository::open(repository.commondir())?
        } else {
            repository
        };

        Ok(Self { repository })
    }
}

impl VcsClient for Git2Client {
    fn work_dir(&self) -> Result<PathBuf> {
        self.repository
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| VcsError::BareRepository(self.repository.path().to_path_buf()))
    }

    fn common_dir(&self) -> PathBuf {
        self.repository.commondir().to_path_buf()
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        match self.repository.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(error) if error.code() == ErrorCode::NotFound => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    fn worktrees(&self) -> Result<Vec<WorktreeInfo>> {
        let mut infos = Vec::new();
        for name in self.repository.worktrees()?.iter().flatten() {
            let worktree = self.repository.find_worktree(name)?;

            // INVARIANT: Pruned or moved worktrees are not worktrees anymore.
            if worktree.validate().is_err() {
                debug!("skip invalid worktree {name:?}");
                continue;
            }

            let branch = Repository::open_from_worktree(&worktree)
                .ok()
                .and_then(|repo| {
                    repo.head()
                        .ok()
                        .and_then(|head| head.shorthand().map(str::to_owned))
                });
            infos.push(WorktreeInfo {
                path: worktree.path().to_path_buf(),
                branch,
            });
        }

        Ok(infos)
    }

    fn status(&self, tree: &Path) -> Result<Vec<StatusEntry>> {
        let repository = Repository::open(tree)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);

        let mut entries = Vec::new();
        for entry in repository.statuses(Some(&mut opts))?.iter() {
            let Some(path) = entry.path() else {
                continue;
            };
            let Some(state) = file_state(entry.status()) else {
                continue;
            };
            entries.push(StatusEntry {
                path: PathBuf::from(path),
                state,
            });
        }

        Ok(entries)
    }
}

fn file_state(status: Status) -> Option<FileState> {
    if status.is_conflicted() {
        Some(FileState::Conflicted)
    } else if status.intersects(Status::INDEX_NEW | Status::WT_NEW) {
        Some(FileState::New)
    } else if status.intersects(Status::INDEX_DELETED | Status::WT_DELETED) {
        Some(FileState::Deleted)
    } else if status.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED) {
        Some(FileState::Renamed)
    } else if status.intersects(Status::INDEX_TYPECHANGE | Status::WT_TYPECHANGE) {
        Some(FileState::Typechange)
    } else if status.intersects(Status::INDEX_MODIFIED | Status::WT_MODIFIED) {
        Some(FileState::Modified)
    } else {
        None
    }
}

/// In-memory version control backend.
///
/// Answers every question from the data it was built with.
#[derive(Debug, Clone, Default)]
pub struct MemoryVcs {
    pub work_dir: Option<PathBuf>,
    pub common_dir: PathBuf,
    pub branches: BTreeSet<String>,
    pub worktrees: Vec<WorktreeInfo>,
    pub statuses: BTreeMap<PathBuf, Vec<StatusEntry>>,
}

impl MemoryVcs {
    /// Construct new in-memory backend for main tree at path.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            common_dir: work_dir.join(".git"),
            work_dir: Some(work_dir),
            ..Self::default()
        }
    }

    /// Register a local branch.
    pub fn with_branch(mut self, name: impl Into<String>) -> Self {
        self.branches.insert(name.into());
        self
    }

    /// Register a linked worktree with branch checked out.
    pub fn with_worktree(mut self, path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        self.worktrees.push(WorktreeInfo {
            path: path.into(),
            branch: Some(branch.into()),
        });
        self
    }
}

impl VcsClient for MemoryVcs {
    fn work_dir(&self) -> Result<PathBuf> {
        self.work_dir
            .clone()
            .ok_or_else(|| VcsError::BareRepository(self.common_dir.clone()))
    }

    fn common_dir(&self) -> PathBuf {
        self.common_dir.clone()
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.branches.contains(name))
    }

    fn worktrees(&self) -> Result<Vec<WorktreeInfo>> {
        Ok(self.worktrees.clone())
    }

    fn status(&self, tree: &Path) -> Result<Vec<StatusEntry>> {
        Ok(self.statuses.get(tree).cloned().unwrap_or_default())
    }
}

/// Version control error types.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// Path is not inside a repository.
    #[error("{:?} is not inside a git repository", path.display())]
    NotARepository {
        #[source]
        source: git2::Error,
        path: PathBuf,
    },

    /// Repository has no working tree to manage documents in.
    #[error("repository at {:?} has no working tree", .0.display())]
    BareRepository(PathBuf),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = VcsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn memory_vcs_answers_from_data() -> anyhow::Result<()> {
        let vcs = MemoryVcs::new("/repo")
            .with_branch("docs")
            .with_worktree("/repo/.docs", "docs");

        assert_eq!(vcs.work_dir()?, PathBuf::from("/repo"));
        assert_eq!(vcs.common_dir(), PathBuf::from("/repo/.git"));
        assert!(vcs.branch_exists("docs")?);
        assert!(!vcs.branch_exists("main")?);
        assert!(vcs.worktree_exists(Path::new("/repo/.docs"))?);
        assert!(!vcs.worktree_exists(Path::new("/repo/other"))?);
        assert!(vcs.status(Path::new("/repo/.docs"))?.is_empty());

        Ok(())
    }

    #[test]
    fn status_flags_map_to_file_state() {
        assert_eq!(file_state(Status::WT_NEW), Some(FileState::New));
        assert_eq!(file_state(Status::INDEX_MODIFIED), Some(FileState::Modified));
        assert_eq!(file_state(Status::WT_TYPECHANGE), Some(FileState::Typechange));
        assert_eq!(file_state(Status::CONFLICTED), Some(FileState::Conflicted));
        assert_eq!(file_state(Status::IGNORED), None);
        assert_eq!(file_state(Status::CURRENT), None);
    }
}
