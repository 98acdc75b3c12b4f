// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Workspace context.
//!
//! A [`Workspace`] bundles everything one invocation of oxidoc needs to know
//! about the repository it runs in: where the main tree and side tree live,
//! what the configuration says, and which ignore-style file holds the
//! managed block. It is built once, checked for sanity once, then handed to
//! every component by reference.
//!
//! # Side Tree Discovery
//!
//! The configuration lives inside the side tree, so the side tree has to be
//! found before the configuration can be read. An explicit path wins. Without
//! one, the first registered worktree carrying a configuration file is used.

use crate::{
    config::{DocConfig, ExclusionMethod, PatternSet},
    ledger::{Ledger, ManagedBlock},
    store::{ConfigStore, StoreError, CONFIG_FILE},
    vcs::{VcsClient, VcsError},
};

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Context of a single oxidoc invocation.
#[derive(Debug, Clone)]
pub struct Workspace {
    main_root: PathBuf,
    side_root: PathBuf,
    config: DocConfig,
    patterns: PatternSet,
    ledger: Ledger,
}

impl Workspace {
    /// Open workspace through version control backend.
    ///
    /// Performs every precondition check up front, so no component ever
    /// starts mutating a tree that is not fit to be worked on.
    ///
    /// # Errors
    ///
    /// - Return [`WorkspaceError::Vcs`] if the main tree cannot be determined.
    /// - Return [`WorkspaceError::MissingSideTree`] if no valid side tree
    ///   checkout can be found.
    /// - Return [`WorkspaceError::Store`] if the configuration cannot be
    ///   loaded.
    /// - Return [`WorkspaceError::MissingBranch`] if the configured branch does
    ///   not exist.
    #[instrument(skip(vcs), level = "debug")]
    pub fn open(vcs: &impl VcsClient, side_override: Option<&Path>) -> Result<Self> {
        let main_root = canonical(vcs.work_dir()?);
        debug!("main tree at {:?}", main_root.display());

        let side_root = match side_override {
            Some(path) => {
                let path = canonical(main_root.join(path));
                if !vcs.worktree_exists(&path)? || !ConfigStore::new(&path).exists() {
                    return Err(WorkspaceError::MissingSideTree(path));
                }
                path
            }
            None => vcs
                .worktrees()?
                .into_iter()
                .map(|info| canonical(info.path))
                .find(|path| ConfigStore::new(path).exists())
                .ok_or_else(|| WorkspaceError::MissingSideTree(main_root.clone()))?,
        };
        debug!("side tree at {:?}", side_root.display());

        let config = ConfigStore::new(&side_root).load()?;
        if !vcs.branch_exists(&config.branch)? {
            return Err(WorkspaceError::MissingBranch(config.branch));
        }

        let expected = canonical(main_root.join(config.worktree.as_path()));
        if expected != side_root {
            warn!(
                "configured worktree {:?} does not match side tree at {:?}",
                config.worktree.to_string(),
                side_root.display()
            );
        }

        let ledger = Ledger::for_method(config.exclusion_method, &main_root, vcs.common_dir());
        Self::from_parts(main_root, side_root, config, ledger)
    }

    /// Construct workspace from already known parts.
    ///
    /// Does not consult version control at all.
    ///
    /// # Errors
    ///
    /// - Return [`WorkspaceError::Config`] if exclusion patterns are invalid.
    pub fn from_parts(
        main_root: impl Into<PathBuf>,
        side_root: impl Into<PathBuf>,
        config: DocConfig,
        ledger: Ledger,
    ) -> Result<Self> {
        let patterns = config.pattern_set()?;
        Ok(Self {
            main_root: main_root.into(),
            side_root: side_root.into(),
            config,
            patterns,
            ledger,
        })
    }

    /// Absolute path to main tree.
    pub fn main_root(&self) -> &Path {
        self.main_root.as_path()
    }

    /// Absolute path to side tree.
    pub fn side_root(&self) -> &Path {
        self.side_root.as_path()
    }

    /// Loaded configuration.
    pub fn config(&self) -> &DocConfig {
        &self.config
    }

    /// Compiled exclusion patterns.
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Ledger holding the managed block.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Configuration store of side tree.
    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(&self.side_root)
    }

    /// Side tree path relative to main tree, if it is nested inside it.
    pub fn mount(&self) -> Option<&Path> {
        self.side_root
            .strip_prefix(&self.main_root)
            .ok()
            .filter(|mount| !mount.as_os_str().is_empty())
    }

    /// Main tree location of document.
    pub fn main_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.main_root.join(rel)
    }

    /// Side tree location of document.
    pub fn side_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.side_root.join(rel)
    }

    /// Files at the top-level of the side tree that belong to oxidoc itself.
    pub fn is_internal(&self, rel: impl AsRef<Path>) -> bool {
        let rel = rel.as_ref();
        rel == Path::new(CONFIG_FILE) || rel == Path::new(".gitignore")
    }

    /// Generate managed block for set of managed documents.
    pub fn managed_block(&self, managed: &BTreeSet<PathBuf>) -> ManagedBlock {
        match self.config.exclusion_method {
            ExclusionMethod::Exclude => ManagedBlock::local(self.mount(), managed),
            ExclusionMethod::Gitignore => ManagedBlock::shared(
                self.mount(),
                self.config.exclude_root_readme,
                self.config.patterns(),
            ),
        }
    }
}

fn canonical(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}

/// Workspace error types.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// No usable side tree checkout.
    #[error(
        "no documentation worktree found from {:?}, expected a registered git worktree containing .oxidoc.json",
        .0.display()
    )]
    MissingSideTree(PathBuf),

    /// Configured documentation branch does not exist.
    #[error("documentation branch {0:?} does not exist")]
    MissingBranch(String),

    /// Version control backend fails.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Configuration store fails.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration content is invalid.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// Friendly result alias :3
pub type Result<T, E = WorkspaceError> = std::result::Result<T, E>;
