// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Cleanup auditing.
//!
//! Two kinds of rot build up when documents get deleted or moved without
//! oxidoc noticing. A __dangling link__ is a markdown symbolic link in the
//! main tree whose target is no longer a regular file. A __stale entry__ is a
//! literal managed block entry naming a path that no longer exists in the
//! main tree. The [`Auditor`] finds both, and repairs them unless asked to
//! only report.

use crate::{
    fsops::{exists_no_follow, FileOps},
    ledger::{entry_path, is_literal_entry, mount_entry, LedgerError},
    sync::walk::DocWalker,
    workspace::Workspace,
};

use std::{collections::BTreeSet, path::PathBuf};
use tracing::{debug, info, instrument, warn};

/// Which issues to audit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuditScope {
    /// Dangling links only.
    Dangling,

    /// Stale managed block entries only.
    Stale,

    /// Everything.
    #[default]
    All,
}

impl AuditScope {
    fn dangling(self) -> bool {
        matches!(self, Self::Dangling | Self::All)
    }

    fn stale(self) -> bool {
        matches!(self, Self::Stale | Self::All)
    }
}

/// Findings of a single audit category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Findings<T> {
    /// Issues found.
    pub found: Vec<T>,

    /// Number of issues repaired.
    pub repaired: usize,

    /// Issues that could not be repaired, with the reason.
    pub failed: Vec<(T, String)>,
}

impl<T> Default for Findings<T> {
    fn default() -> Self {
        Self {
            found: Vec::new(),
            repaired: 0,
            failed: Vec::new(),
        }
    }
}

/// Summary of an audit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuditReport {
    /// Dangling links, relative to main tree.
    pub dangling: Findings<PathBuf>,

    /// Stale managed block entries.
    pub stale: Findings<String>,

    /// Audit only reported, and repaired nothing.
    pub dry_run: bool,
}

impl AuditReport {
    /// Total number of repaired issues.
    pub fn repaired(&self) -> usize {
        self.dangling.repaired + self.stale.repaired
    }

    /// Total number of issues that could not be repaired.
    pub fn failed(&self) -> usize {
        self.dangling.failed.len() + self.stale.failed.len()
    }

    /// Check if audit left something for the user to act on.
    ///
    /// A report-only run signals dangling links. A repairing run signals
    /// failed repairs.
    pub fn needs_attention(&self) -> bool {
        if self.dry_run {
            !self.dangling.found.is_empty()
        } else {
            self.failed() != 0
        }
    }
}

/// Cleanup auditor.
#[derive(Debug)]
pub struct Auditor<'ws> {
    workspace: &'ws Workspace,
}

impl<'ws> Auditor<'ws> {
    /// Construct new auditor.
    pub fn new(workspace: &'ws Workspace) -> Self {
        Self { workspace }
    }

    /// Audit, and repair unless `dry_run` is set.
    ///
    /// # Errors
    ///
    /// - Return [`AuditError::Ledger`] if the managed block cannot be read.
    #[instrument(skip(self), level = "debug")]
    pub fn audit(&self, scope: AuditScope, dry_run: bool) -> Result<AuditReport> {
        let ops = FileOps::new(dry_run);
        let mut report = AuditReport {
            dry_run,
            ..AuditReport::default()
        };

        if scope.dangling() {
            report.dangling = self.repair_dangling(&ops);
        }

        if scope.stale() {
            // INVARIANT: Links slated for removal count as gone even when only reporting.
            let doomed_links = report
                .dangling
                .found
                .iter()
                .filter(|rel| !report.dangling.failed.iter().any(|(path, _)| path == *rel))
                .collect::<BTreeSet<_>>();
            report.stale = self.repair_stale(&doomed_links, dry_run)?;
        }

        info!(
            "found {} dangling link(s) and {} stale entry(ies)",
            report.dangling.found.len(),
            report.stale.found.len()
        );

        Ok(report)
    }

    /// Dangling links of main tree.
    pub fn dangling_links(&self) -> Vec<PathBuf> {
        let workspace = self.workspace;
        let mut walker = DocWalker::new(workspace.main_root());
        if let Some(mount) = workspace.mount() {
            walker = walker.prune(workspace.main_path(mount));
        }

        walker
            .documents()
            .into_iter()
            .filter(|doc| doc.is_symlink && !workspace.main_path(&doc.rel).is_file())
            .map(|doc| doc.rel)
            .collect()
    }

    /// Stale entries of managed block.
    ///
    /// # Errors
    ///
    /// - Return [`AuditError::Ledger`] if the managed block cannot be read.
    pub fn stale_entries(&self) -> Result<Vec<String>> {
        self.find_stale(&BTreeSet::new())
    }

    fn find_stale(&self, doomed_links: &BTreeSet<&PathBuf>) -> Result<Vec<String>> {
        let workspace = self.workspace;
        let mount = workspace.mount().map(mount_entry);

        let stale = workspace
            .ledger()
            .entries()?
            .into_iter()
            .filter(|entry| is_literal_entry(entry, mount.as_deref()))
            .filter(|entry| {
                let rel = entry_path(entry);
                !exists_no_follow(&workspace.main_path(&rel)) || doomed_links.contains(&rel)
            })
            .collect();

        Ok(stale)
    }

    fn repair_dangling(&self, ops: &FileOps) -> Findings<PathBuf> {
        let mut findings = Findings {
            found: self.dangling_links(),
            ..Findings::default()
        };

        for rel in &findings.found {
            debug!("dangling link {:?}", rel.display());
            match ops.remove_file(&self.workspace.main_path(rel)) {
                Ok(()) if ops.is_dry_run() => {}
                Ok(()) => findings.repaired += 1,
                Err(error) => {
                    warn!("cannot remove dangling link {:?}: {error}", rel.display());
                    findings.failed.push((rel.clone(), error.to_string()));
                }
            }
        }

        findings
    }

    fn repair_stale(&self, doomed_links: &BTreeSet<&PathBuf>, dry_run: bool) -> Result<Findings<String>> {
        let mut findings = Findings {
            found: self.find_stale(doomed_links)?,
            ..Findings::default()
        };
        if findings.found.is_empty() {
            return Ok(findings);
        }

        let doomed = findings.found.iter().cloned().collect::<BTreeSet<_>>();
        match self.workspace.ledger().remove(&doomed, dry_run) {
            Ok(_) if dry_run => {}
            Ok(_) => findings.repaired = findings.found.len(),
            Err(error) => {
                warn!("cannot remove stale entries: {error}");
                let reason = error.to_string();
                findings.failed = findings
                    .found
                    .iter()
                    .map(|entry| (entry.clone(), reason.clone()))
                    .collect();
            }
        }

        Ok(findings)
    }
}

/// Cleanup audit error types.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Managed block cannot be read.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Friendly result alias :3
pub type Result<T, E = AuditError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{DocConfig, ExclusionMethod},
        fsops::is_symlink,
        ledger::{Ledger, ManagedBlock},
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{fs, os::unix::fs::symlink, path::Path};

    fn workspace() -> anyhow::Result<Workspace> {
        let root = std::env::current_dir()?.canonicalize()?;
        fs::create_dir_all(root.join(".docs"))?;
        fs::create_dir_all(root.join(".git/info"))?;

        let config = DocConfig::new("docs", ".docs", ExclusionMethod::Exclude);
        let ledger = Ledger::for_method(ExclusionMethod::Exclude, &root, root.join(".git"));
        Ok(Workspace::from_parts(&root, root.join(".docs"), config, ledger)?)
    }

    #[sealed_test]
    fn dangling_link_is_removed() -> anyhow::Result<()> {
        let ws = workspace()?;
        fs::create_dir_all("x")?;
        symlink("../.docs/x/gone.md", "x/gone.md")?;
        fs::write(".docs/kept.md", "kept")?;
        symlink(".docs/kept.md", "kept.md")?;

        let report = Auditor::new(&ws).audit(AuditScope::Dangling, true)?;
        assert_eq!(report.dangling.found, vec![PathBuf::from("x/gone.md")]);
        assert!(report.needs_attention());
        assert!(is_symlink(Path::new("x/gone.md")));

        let report = Auditor::new(&ws).audit(AuditScope::Dangling, false)?;
        assert_eq!(report.dangling.repaired, 1);
        assert!(!report.needs_attention());
        assert!(!exists_no_follow(Path::new("x/gone.md")));
        assert!(is_symlink(Path::new("kept.md")));

        Ok(())
    }

    #[sealed_test]
    fn stale_entry_is_removed_surgically() -> anyhow::Result<()> {
        let ws = workspace()?;
        fs::write(".docs/kept.md", "kept")?;
        symlink(".docs/kept.md", "kept.md")?;

        let paths = [PathBuf::from("kept.md"), PathBuf::from("old/doc.md")];
        let block = ManagedBlock::local(ws.mount(), &paths);
        fs::write(ws.ledger().path(), format!("# mine\nbuild/\n{block}"))?;

        let report = Auditor::new(&ws).audit(AuditScope::Stale, false)?;
        assert_eq!(report.stale.found, vec!["/old/doc.md".to_string()]);
        assert_eq!(report.stale.repaired, 1);

        let expect = indoc! {"
            # mine
            build/
            # >>> oxidoc managed block >>>
            .docs/
            /kept.md
            # <<< oxidoc managed block <<<
        "};
        assert_eq!(fs::read_to_string(ws.ledger().path())?, expect);

        Ok(())
    }

    #[sealed_test]
    fn patterns_and_mount_are_never_stale() -> anyhow::Result<()> {
        let ws = workspace()?;
        let block = ManagedBlock::new([".docs/", "*.md", "!/README.md", "!CHANGELOG.md"]);
        fs::write(ws.ledger().path(), block.to_string())?;

        assert!(Auditor::new(&ws).stale_entries()?.is_empty());

        Ok(())
    }

    #[sealed_test]
    fn escaped_entries_are_audited_by_their_literal_name() -> anyhow::Result<()> {
        let ws = workspace()?;
        fs::write(".docs/notes[1].md", "kept")?;
        symlink(".docs/notes[1].md", "notes[1].md")?;

        let paths = [PathBuf::from("notes[1].md"), PathBuf::from("!bang.md")];
        fs::write(ws.ledger().path(), ManagedBlock::local(ws.mount(), &paths).to_string())?;

        let report = Auditor::new(&ws).audit(AuditScope::Stale, false)?;
        assert_eq!(report.stale.found, vec![r"/\!bang.md".to_string()]);
        assert_eq!(ws.ledger().entries()?, vec![".docs/", r"/notes\[1\].md"]);

        Ok(())
    }

    #[sealed_test]
    fn full_dry_run_counts_doomed_links_as_stale() -> anyhow::Result<()> {
        let ws = workspace()?;
        symlink(".docs/gone.md", "gone.md")?;
        let paths = [PathBuf::from("gone.md")];
        fs::write(ws.ledger().path(), ManagedBlock::local(ws.mount(), &paths).to_string())?;
        let before = fs::read_to_string(ws.ledger().path())?;

        let report = Auditor::new(&ws).audit(AuditScope::All, true)?;
        assert_eq!(report.dangling.found, vec![PathBuf::from("gone.md")]);
        assert_eq!(report.stale.found, vec!["/gone.md".to_string()]);
        assert_eq!(report.repaired(), 0);
        assert_eq!(fs::read_to_string(ws.ledger().path())?, before);

        let report = Auditor::new(&ws).audit(AuditScope::All, false)?;
        assert_eq!(report.repaired(), 2);
        assert_eq!(ws.ledger().entries()?, vec![".docs/"]);

        Ok(())
    }
}
