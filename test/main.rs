// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use git2::{IndexEntry, IndexTime, Repository, RepositoryInitOptions, WorktreeAddOptions};
use oxidoc::{
    config::{DocConfig, ExclusionMethod},
    store::ConfigStore,
};
use std::path::{Path, PathBuf};

pub(crate) struct RepoFixture {
    repo: Repository,
    root: PathBuf,
}

impl RepoFixture {
    pub(crate) fn new(path: impl AsRef<Path>, kind: RepoKind) -> Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        opts.bare(kind.is_bare());
        let repo = Repository::init_opts(path.as_ref(), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        let root = path.as_ref().canonicalize()?;
        Ok(Self { repo, root })
    }

    pub(crate) fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub(crate) fn stage_and_commit(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<()> {
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: contents.as_ref().len() as u32,
            id: self.repo.blob(contents.as_ref().as_bytes())?,
            flags: 0,
            flags_extended: 0,
            path: filename.as_ref().to_string_lossy().into_owned().into_bytes(),
        };

        // INVARIANT: Always use new tree produced by index after staging new entry.
        let mut index = self.repo.index()?;
        index.add_frombuffer(&entry, contents.as_ref().as_bytes())?;
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let signature = self.repo.signature()?;
        let mut parents = Vec::new();
        if let Some(parent) = self.repo.head().ok().and_then(|head| head.target()) {
            parents.push(self.repo.find_commit(parent)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            format!("chore: add {:?}", filename.as_ref()).as_ref(),
            &tree,
            &parents,
        )?;

        Ok(())
    }

    /// Create orphan documentation branch checked out as linked worktree.
    pub(crate) fn add_doc_worktree(
        &self,
        branch: &str,
        worktree: impl AsRef<Path>,
        method: ExclusionMethod,
    ) -> Result<PathBuf> {
        // INVARIANT: Orphan branch starts from an empty tree with no parents.
        let tree_oid = self.repo.treebuilder(None)?.write()?;
        let tree = self.repo.find_tree(tree_oid)?;
        let signature = self.repo.signature()?;
        let commit_oid = self.repo.commit(
            None,
            &signature,
            &signature,
            "chore: start documentation branch",
            &tree,
            &[],
        )?;
        let commit = self.repo.find_commit(commit_oid)?;
        let branch_ref = self.repo.branch(branch, &commit, false)?;

        let side_root = self.root.join(worktree.as_ref());
        let mut opts = WorktreeAddOptions::new();
        opts.reference(Some(branch_ref.get()));
        self.repo.worktree(branch, &side_root, Some(&opts))?;

        let config = DocConfig::new(branch, worktree.as_ref(), method);
        ConfigStore::new(&side_root).save(&config)?;

        Ok(side_root.canonicalize()?)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) enum RepoKind {
    #[default]
    Normal,

    Bare,
}

impl RepoKind {
    pub(crate) fn is_bare(&self) -> bool {
        match self {
            Self::Bare => true,
            Self::Normal => false,
        }
    }
}
