// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document reconciliation.
//!
//! The reconciler converges both trees toward one invariant: every document
//! that is not excluded has exactly one regular file in the side tree, and
//! one relative symbolic link in the main tree pointing at it. That state is
//! called __linked__.
//!
//! # Passes
//!
//! Reconciliation runs in two passes. The __forward pass__ walks the main
//! tree and moves plain documents over to the side tree, replacing them with
//! links. The __reverse pass__ walks the side tree and makes sure each of its
//! documents has a correct link in the main tree. Both passes record every
//! document they consider, and the exclusion ledger is regenerated from that
//! record at the end.
//!
//! The forward pass does not re-check links that already exist. A link whose
//! target went missing is the business of the [`cleanup`](crate::cleanup)
//! auditor, which can run as a pre-step through [`SyncOptions::cleanup`].
//!
//! # Failure Semantics
//!
//! A missing side tree aborts before anything is touched. Anything going
//! wrong with a single document is logged, counted in the [`SyncReport`], and
//! the pass moves on to the next document. Only losing contact with the user
//! during a conflict prompt aborts mid-run.

pub mod conflict;
pub mod walk;

use crate::{
    cleanup::{AuditError, AuditScope, Auditor},
    fsops::{exists_no_follow, is_symlink, link_resolves_to, FileOps, FsError},
    ledger::LedgerError,
    path::{relative_path, ROOT_README},
    sync::{
        conflict::{apply, AutoResolve, Conflict, ConflictError, Resolve},
        walk::DocWalker,
    },
    workspace::Workspace,
};

use indicatif::ProgressBar;
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Which passes to run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Forward pass then reverse pass.
    #[default]
    Both,

    /// Forward pass only, main tree to side tree.
    ToSide,

    /// Reverse pass only, side tree to main tree.
    ToMain,
}

impl Direction {
    fn forward(self) -> bool {
        matches!(self, Self::Both | Self::ToSide)
    }

    fn reverse(self) -> bool {
        matches!(self, Self::Both | Self::ToMain)
    }
}

/// Knobs of a single reconciliation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Report mutations instead of performing them.
    pub dry_run: bool,

    /// Run the cleanup auditor before syncing.
    pub cleanup: bool,

    /// Passes to run.
    pub direction: Direction,
}

/// Summary of a reconciliation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Documents considered by either pass.
    pub processed: usize,

    /// Documents moved from main tree into side tree.
    pub created: usize,

    /// Main tree copies removed because they match the side tree.
    pub deduplicated: usize,

    /// Links created where there was nothing.
    pub linked: usize,

    /// Incorrect links replaced.
    pub relinked: usize,

    /// Backup files written by conflict resolution.
    pub backed_up: usize,

    /// Documents needing no work.
    pub skipped: usize,

    /// Distinct documents ignored through exclusion patterns.
    pub excluded: usize,

    /// Regular main tree files found by a lone reverse pass.
    pub unexpected: usize,

    /// Documents left divergent.
    pub divergent: Vec<PathBuf>,

    /// Documents that failed, with the reason.
    pub errors: Vec<(PathBuf, String)>,

    /// Documents that belong in the managed block.
    pub managed: BTreeSet<PathBuf>,

    /// Managed block content changed.
    pub ledger_changed: bool,

    /// Issues fixed by the cleanup pre-step.
    pub cleaned: usize,
}

impl SyncReport {
    /// Total number of file system mutations performed (or planned).
    pub fn mutations(&self) -> usize {
        self.created
            + self.deduplicated
            + self.linked
            + self.relinked
            + self.backed_up
            + self.cleaned
            + usize::from(self.ledger_changed)
    }
}

impl Display for SyncReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "processed {}, created {}, linked {}, relinked {}, deduplicated {}, backed up {}, skipped {}, excluded {}",
            self.processed,
            self.created,
            self.linked,
            self.relinked,
            self.deduplicated,
            self.backed_up,
            self.skipped,
            self.excluded,
        )?;
        if !self.divergent.is_empty() {
            write!(fmt, ", divergent {}", self.divergent.len())?;
        }
        if self.unexpected != 0 {
            write!(fmt, ", unexpected {}", self.unexpected)?;
        }
        if !self.errors.is_empty() {
            write!(fmt, ", failed {}", self.errors.len())?;
        }

        Ok(())
    }
}

/// What happened to a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Skipped,
    Created,
    Deduplicated { link: bool },
    Resolved { link: bool, backups: usize },
    Linked,
    Relinked,
    Unexpected,
}

/// The reconciler.
pub struct Reconciler<'ws, R = AutoResolve>
where
    R: Resolve,
{
    workspace: &'ws Workspace,
    options: SyncOptions,
    ops: FileOps,
    resolver: R,
    bar: ProgressBar,
}

impl<'ws> Reconciler<'ws, AutoResolve> {
    /// Construct new reconciler with deterministic conflict resolution.
    pub fn new(workspace: &'ws Workspace, options: SyncOptions) -> Self {
        Self::with_resolver(workspace, options, AutoResolve)
    }
}

impl<'ws, R> Reconciler<'ws, R>
where
    R: Resolve,
{
    /// Construct new reconciler with custom conflict resolution.
    pub fn with_resolver(workspace: &'ws Workspace, options: SyncOptions, resolver: R) -> Self {
        Self {
            workspace,
            options,
            ops: FileOps::new(options.dry_run),
            resolver,
            bar: ProgressBar::hidden(),
        }
    }

    /// Report progress through a progress bar.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    /// Run reconciliation.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::MissingSideTree`] if side tree is gone.
    /// - Return [`SyncError::Cleanup`] if the cleanup pre-step fails.
    /// - Return [`SyncError::Conflict`] if conflict prompting fails.
    /// - Return [`SyncError::Ledger`] if the managed block cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&mut self) -> Result<SyncReport> {
        let side_root = self.workspace.side_root();
        if !side_root.is_dir() {
            return Err(SyncError::MissingSideTree(side_root.to_path_buf()));
        }

        let mut report = SyncReport::default();
        let mut excluded = BTreeSet::new();
        if self.options.cleanup {
            let audit = Auditor::new(self.workspace).audit(AuditScope::All, self.options.dry_run)?;
            report.cleaned = audit.repaired();
        }

        let forward = self.options.direction.forward();
        if forward {
            self.forward_pass(&mut report, &mut excluded)?;
        }
        if self.options.direction.reverse() {
            self.reverse_pass(&mut report, &mut excluded, forward)?;
        }
        report.excluded = excluded.len();

        let block = self.workspace.managed_block(&report.managed);
        report.ledger_changed = self.workspace.ledger().rewrite(&block, self.options.dry_run)?;
        self.bar.finish_and_clear();

        Ok(report)
    }

    /// Move main tree documents into the side tree.
    #[instrument(skip(self, report, excluded), level = "debug")]
    fn forward_pass(
        &mut self,
        report: &mut SyncReport,
        excluded: &mut BTreeSet<PathBuf>,
    ) -> Result<()> {
        let workspace = self.workspace;
        let mut walker = DocWalker::new(workspace.main_root());
        if let Some(mount) = workspace.mount() {
            walker = walker.prune(workspace.main_path(mount));
        }

        for doc in walker.documents() {
            if doc.rel == Path::new(ROOT_README) {
                debug!("skip root {ROOT_README}");
                continue;
            }
            if workspace.patterns().is_excluded(&doc.rel) {
                debug!("exclude {:?} by pattern", doc.rel.display());
                excluded.insert(doc.rel);
                continue;
            }

            self.bar.set_message(doc.rel.display().to_string());
            report.processed += 1;
            report.managed.insert(doc.rel.clone());

            match self.forward_one(&doc.rel, doc.is_symlink) {
                Ok(outcome) => tally(report, &doc.rel, outcome),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    warn!("skip {:?}: {error}", doc.rel.display());
                    report.errors.push((doc.rel, error.to_string()));
                }
            }
        }

        Ok(())
    }

    fn forward_one(&mut self, rel: &Path, is_link: bool) -> Result<Outcome> {
        if is_link {
            return Ok(Outcome::Skipped);
        }

        let main = self.workspace.main_path(rel);
        let side = self.workspace.side_path(rel);

        let outcome = if !exists_no_follow(&side) {
            self.ops.move_file(&main, &side)?;
            Outcome::Created
        } else if same_content(&main, &side)? {
            self.ops.remove_file(&main)?;
            Outcome::Deduplicated { link: true }
        } else {
            let conflict = Conflict::new(rel, &main, &side);
            let resolution = if self.ops.is_dry_run() {
                info!("would resolve conflict on {:?}", rel.display());
                AutoResolve.resolve(&conflict)?
            } else {
                self.resolver.resolve(&conflict)?
            };
            let applied = apply(&conflict, resolution, &self.ops)?;
            Outcome::Resolved {
                link: applied.link,
                backups: applied.backups,
            }
        };

        let link = match outcome {
            Outcome::Created => true,
            Outcome::Deduplicated { link } | Outcome::Resolved { link, .. } => link,
            _ => false,
        };
        if link {
            self.place_link(rel)?;
        }

        Ok(outcome)
    }

    /// Link side tree documents back into the main tree.
    #[instrument(skip(self, report, excluded), level = "debug")]
    fn reverse_pass(
        &mut self,
        report: &mut SyncReport,
        excluded: &mut BTreeSet<PathBuf>,
        forward_ran: bool,
    ) -> Result<()> {
        let workspace = self.workspace;
        for doc in DocWalker::new(workspace.side_root()).documents() {
            if doc.rel == Path::new(ROOT_README) || workspace.is_internal(&doc.rel) {
                debug!("skip side tree internal {:?}", doc.rel.display());
                continue;
            }
            if workspace.patterns().is_excluded(&doc.rel) {
                debug!("exclude {:?} by pattern", doc.rel.display());
                excluded.insert(doc.rel);
                continue;
            }
            if doc.is_symlink {
                debug!("skip symbolic link {:?} inside side tree", doc.rel.display());
                continue;
            }

            self.bar.set_message(doc.rel.display().to_string());
            report.managed.insert(doc.rel.clone());

            match self.reverse_one(&doc.rel, forward_ran) {
                Ok(Outcome::Skipped) => {}
                Ok(outcome) => {
                    report.processed += 1;
                    tally(report, &doc.rel, outcome);
                }
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    warn!("skip {:?}: {error}", doc.rel.display());
                    report.errors.push((doc.rel, error.to_string()));
                }
            }
        }

        Ok(())
    }

    fn reverse_one(&mut self, rel: &Path, forward_ran: bool) -> Result<Outcome> {
        let main = self.workspace.main_path(rel);

        if is_symlink(&main) {
            if self.is_correct_link(rel) {
                return Ok(Outcome::Skipped);
            }
            debug!("replace incorrect link {:?}", main.display());
            self.ops.remove_file(&main)?;
            self.place_link(rel)?;
            return Ok(Outcome::Relinked);
        }

        if exists_no_follow(&main) {
            if forward_ran {
                debug!("leave regular file {:?} alone", main.display());
                return Ok(Outcome::Skipped);
            }
            warn!("unexpected regular file {:?} in main tree", main.display());
            return Ok(Outcome::Unexpected);
        }

        self.place_link(rel)?;
        Ok(Outcome::Linked)
    }

    fn place_link(&self, rel: &Path) -> Result<()> {
        let main = self.workspace.main_path(rel);
        self.ops.symlink(&self.link_content(rel), &main)?;
        Ok(())
    }

    fn link_content(&self, rel: &Path) -> PathBuf {
        let main = self.workspace.main_path(rel);
        let from_dir = main.parent().unwrap_or(self.workspace.main_root());
        relative_path(from_dir, self.workspace.side_path(rel))
    }

    fn is_correct_link(&self, rel: &Path) -> bool {
        link_resolves_to(&self.workspace.main_path(rel), &self.workspace.side_path(rel))
    }
}

fn tally(report: &mut SyncReport, rel: &Path, outcome: Outcome) {
    match outcome {
        Outcome::Skipped => report.skipped += 1,
        Outcome::Created => {
            report.created += 1;
            report.linked += 1;
        }
        Outcome::Deduplicated { .. } => {
            report.deduplicated += 1;
            report.linked += 1;
        }
        Outcome::Resolved { link, backups } => {
            report.backed_up += backups;
            if link {
                report.linked += 1;
            } else {
                report.divergent.push(rel.to_path_buf());
            }
        }
        Outcome::Linked => report.linked += 1,
        Outcome::Relinked => report.relinked += 1,
        Outcome::Unexpected => report.unexpected += 1,
    }
}

fn same_content(lhs: &Path, rhs: &Path) -> Result<bool> {
    let read = |path: &Path| {
        fs::read(path).map_err(|err| SyncError::Read {
            source: err,
            path: path.to_path_buf(),
        })
    };

    Ok(read(lhs)? == read(rhs)?)
}

/// Reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Side tree checkout is gone.
    #[error("side tree {:?} is not a valid checkout", .0.display())]
    MissingSideTree(PathBuf),

    /// Document cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// File operation fails on a document.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Conflict resolution fails.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Cleanup pre-step fails.
    #[error(transparent)]
    Cleanup(#[from] AuditError),

    /// Managed block cannot be rewritten.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SyncError {
    /// Check if error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Read { .. } | Self::Fs(_) => false,
            Self::Conflict(error) => error.is_fatal(),
            Self::MissingSideTree(_) | Self::Cleanup(_) | Self::Ledger(_) => true,
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{DocConfig, ExclusionMethod},
        fsops::is_regular_file,
        ledger::Ledger,
        sync::conflict::{PromptResolve, ScriptedChoices},
    };
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn workspace(method: ExclusionMethod, patterns: &[&str]) -> anyhow::Result<Workspace> {
        let root = std::env::current_dir()?.canonicalize()?;
        fs::create_dir_all(root.join(".docs"))?;
        fs::create_dir_all(root.join(".git/info"))?;

        let mut config = DocConfig::new("docs", ".docs", method);
        config.set_patterns(patterns.iter().copied());
        let ledger = Ledger::for_method(method, &root, root.join(".git"));

        Ok(Workspace::from_parts(&root, root.join(".docs"), config, ledger)?)
    }

    fn write(path: impl AsRef<Path>, content: &str) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    #[sealed_test]
    fn forward_sync_moves_and_links() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write("a/README.md", "X")?;

        let report = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert_eq!(report.created, 1);
        assert_eq!(report.linked, 1);

        assert!(is_symlink(Path::new("a/README.md")));
        assert_eq!(fs::read_link("a/README.md")?, PathBuf::from("../.docs/a/README.md"));
        assert_eq!(fs::read_to_string(".docs/a/README.md")?, "X");
        assert_eq!(fs::read_to_string("a/README.md")?, "X");
        assert!(ws.ledger().entries()?.contains(&"/a/README.md".to_string()));

        Ok(())
    }

    #[sealed_test]
    fn second_run_is_a_no_op() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write("a/README.md", "X")?;
        write("guide/install.md", "steps")?;
        write(".docs/only-side.md", "side")?;

        let first = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert!(first.mutations() > 0);
        let ledger_before = ws.ledger().read()?;

        let second = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert_eq!(second.mutations(), 0);
        assert_eq!(second.managed, first.managed);
        assert_eq!(ws.ledger().read()?, ledger_before);

        Ok(())
    }

    #[sealed_test]
    fn identical_copies_are_deduplicated() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write("same.md", "same")?;
        write(".docs/same.md", "same")?;

        let report = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert_eq!(report.deduplicated, 1);
        assert!(is_symlink(Path::new("same.md")));
        assert!(!Path::new("same.md.bak").exists());

        Ok(())
    }

    #[sealed_test]
    fn conflict_backs_up_main_copy_without_prompting() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write("b/README.md", "Y1")?;
        write(".docs/b/README.md", "Y2")?;

        let report = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert_eq!(report.backed_up, 1);
        assert_eq!(fs::read_to_string("b/README.md.bak")?, "Y1");
        assert_eq!(fs::read_to_string(".docs/b/README.md")?, "Y2");
        assert!(is_symlink(Path::new("b/README.md")));
        assert_eq!(fs::read_to_string("b/README.md")?, "Y2");

        Ok(())
    }

    #[sealed_test]
    fn skipped_conflict_stays_divergent() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write("b/README.md", "Y1")?;
        write(".docs/b/README.md", "Y2")?;

        let resolver = PromptResolve::new(ScriptedChoices::new(["4"]));
        let report = Reconciler::with_resolver(&ws, SyncOptions::default(), resolver).run()?;

        assert_eq!(report.divergent, vec![PathBuf::from("b/README.md")]);
        assert_eq!(report.unexpected, 0);
        assert!(is_regular_file(Path::new("b/README.md")));
        assert_eq!(fs::read_to_string("b/README.md")?, "Y1");
        assert_eq!(fs::read_to_string(".docs/b/README.md")?, "Y2");

        Ok(())
    }

    #[sealed_test]
    fn reverse_pass_links_and_repairs() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write(".docs/README.md", "side overview")?;
        write(".docs/new/page.md", "new")?;
        write(".docs/moved.md", "moved")?;
        write("elsewhere.md", "wrong")?;
        std::os::unix::fs::symlink("elsewhere.md", "moved.md")?;

        let report = Reconciler::new(&ws, SyncOptions {
            direction: Direction::ToMain,
            ..SyncOptions::default()
        })
        .run()?;

        assert_eq!(report.linked, 1);
        assert_eq!(report.relinked, 1);
        assert_eq!(fs::read_to_string("new/page.md")?, "new");
        assert_eq!(fs::read_link("moved.md")?, PathBuf::from(".docs/moved.md"));
        assert!(!exists_no_follow(Path::new("README.md")));

        Ok(())
    }

    #[sealed_test]
    fn lone_reverse_pass_flags_regular_files() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write(".docs/page.md", "side")?;
        write("page.md", "main")?;

        let report = Reconciler::new(&ws, SyncOptions {
            direction: Direction::ToMain,
            ..SyncOptions::default()
        })
        .run()?;

        assert_eq!(report.unexpected, 1);
        assert_eq!(fs::read_to_string("page.md")?, "main");

        Ok(())
    }

    #[sealed_test]
    fn patterns_and_root_readme_stay_in_main() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Gitignore, &["CHANGELOG.md"])?;
        write("README.md", "root")?;
        write("CHANGELOG.md", "changes")?;
        write("pkg/CHANGELOG.md", "changes")?;
        write("node_modules/dep/README.md", "dep")?;
        write("docs/guide.md", "guide")?;

        let report = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert_eq!(report.managed, BTreeSet::from([PathBuf::from("docs/guide.md")]));
        assert_eq!(report.excluded, 2);

        for path in ["README.md", "CHANGELOG.md", "pkg/CHANGELOG.md", "node_modules/dep/README.md"] {
            assert!(is_regular_file(Path::new(path)), "{path} should stay put");
        }
        assert_eq!(
            ws.ledger().entries()?,
            vec![".docs/", "*.md", "!/README.md", "!CHANGELOG.md"]
        );

        Ok(())
    }

    #[sealed_test]
    fn excluded_document_in_both_trees_counts_once() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &["CHANGELOG.md"])?;
        write("CHANGELOG.md", "main")?;
        write(".docs/CHANGELOG.md", "side")?;
        write(".docs/pkg/CHANGELOG.md", "side only")?;

        let report = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert_eq!(report.excluded, 2);
        assert!(report.managed.is_empty());
        assert_eq!(fs::read_to_string("CHANGELOG.md")?, "main");
        assert!(!exists_no_follow(Path::new("pkg/CHANGELOG.md")));

        Ok(())
    }

    #[sealed_test]
    fn failing_document_is_reported_and_pass_continues() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write(".docs/blocked", "not a directory")?;
        write("blocked/a.md", "stuck")?;
        write("open/b.md", "free")?;

        let report = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, PathBuf::from("blocked/a.md"));
        assert_eq!(report.linked, 1);

        assert!(is_regular_file(Path::new("blocked/a.md")));
        assert_eq!(fs::read_to_string("blocked/a.md")?, "stuck");
        assert!(is_symlink(Path::new("open/b.md")));
        assert_eq!(fs::read_to_string("open/b.md")?, "free");
        assert!(ws.ledger().entries()?.contains(&"/open/b.md".to_string()));

        Ok(())
    }

    #[sealed_test]
    fn dry_run_changes_nothing_but_reports_the_same() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write("a/README.md", "X")?;
        write("b/README.md", "Y1")?;
        write(".docs/b/README.md", "Y2")?;
        write(".docs/c/README.md", "Z")?;

        let dry = Reconciler::new(&ws, SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .run()?;

        assert!(is_regular_file(Path::new("a/README.md")));
        assert!(is_regular_file(Path::new("b/README.md")));
        assert!(!exists_no_follow(Path::new("c/README.md")));
        assert!(!exists_no_follow(Path::new(".docs/a/README.md")));
        assert!(!ws.ledger().path().exists());
        assert!(dry.ledger_changed);

        let real = Reconciler::new(&ws, SyncOptions::default()).run()?;
        assert_eq!(dry.managed, real.managed);

        Ok(())
    }

    #[sealed_test]
    fn missing_side_tree_is_fatal() -> anyhow::Result<()> {
        let ws = workspace(ExclusionMethod::Exclude, &[])?;
        write("a/README.md", "X")?;
        fs::remove_dir_all(".docs")?;

        let result = Reconciler::new(&ws, SyncOptions::default()).run();
        assert!(matches!(result, Err(SyncError::MissingSideTree(_))));
        assert!(is_regular_file(Path::new("a/README.md")));

        Ok(())
    }
}
