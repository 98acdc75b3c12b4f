// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Read-only placement survey.
//!
//! Classifies every document of both trees without touching either of them.

use crate::{
    fsops::{is_regular_file, is_symlink, link_resolves_to},
    path::ROOT_README,
    sync::walk::DocWalker,
    workspace::Workspace,
};

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};
use tracing::instrument;

/// Where a document currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placement {
    /// Side tree file with a correct link in main tree.
    Linked,

    /// Regular file in main tree only.
    OnlyInMain,

    /// Regular file in side tree only.
    OnlyInSide,

    /// Regular files in both trees with different content.
    Divergent,

    /// Regular files in both trees with identical content.
    Duplicated,

    /// Main tree link landing on some other regular file.
    Misdirected,

    /// Main tree link whose target is not a regular file.
    DanglingLink,
}

impl Display for Placement {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Linked => "linked",
            Self::OnlyInMain => "only in main",
            Self::OnlyInSide => "only in side",
            Self::Divergent => "divergent",
            Self::Duplicated => "duplicated",
            Self::Misdirected => "misdirected",
            Self::DanglingLink => "dangling link",
        };

        fmt.write_str(name)
    }
}

/// Placement of a single document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Surveyed {
    pub rel: PathBuf,
    pub placement: Placement,
}

/// Survey every non-excluded document.
///
/// Result is sorted by path.
///
/// # Errors
///
/// - Return [`SurveyError::Read`] if both copies of a document exist but
///   either cannot be read.
#[instrument(skip(workspace), level = "debug")]
pub fn survey(workspace: &Workspace) -> Result<Vec<Surveyed>> {
    let mut main_walker = DocWalker::new(workspace.main_root());
    if let Some(mount) = workspace.mount() {
        main_walker = main_walker.prune(workspace.main_path(mount));
    }

    let candidates = main_walker
        .documents()
        .into_iter()
        .chain(DocWalker::new(workspace.side_root()).documents())
        .map(|doc| doc.rel)
        .filter(|rel| rel != Path::new(ROOT_README) && !workspace.is_internal(rel))
        .filter(|rel| !workspace.patterns().is_excluded(rel))
        .collect::<BTreeSet<_>>();

    candidates
        .into_iter()
        .filter_map(|rel| match classify(workspace, &rel) {
            Ok(Some(placement)) => Some(Ok(Surveyed { rel, placement })),
            Ok(None) => None,
            Err(error) => Some(Err(error)),
        })
        .collect()
}

/// Count documents per placement.
pub fn tally(surveyed: &[Surveyed]) -> BTreeMap<Placement, usize> {
    surveyed.iter().fold(BTreeMap::new(), |mut counts, doc| {
        *counts.entry(doc.placement).or_default() += 1;
        counts
    })
}

fn classify(workspace: &Workspace, rel: &Path) -> Result<Option<Placement>> {
    let main = workspace.main_path(rel);
    let side = workspace.side_path(rel);
    let in_side = is_regular_file(&side);

    let placement = if is_symlink(&main) {
        if link_resolves_to(&main, &side) {
            Placement::Linked
        } else if main.is_file() {
            Placement::Misdirected
        } else {
            Placement::DanglingLink
        }
    } else if is_regular_file(&main) {
        if !in_side {
            Placement::OnlyInMain
        } else if read(&main)? == read(&side)? {
            Placement::Duplicated
        } else {
            Placement::Divergent
        }
    } else if in_side {
        Placement::OnlyInSide
    } else {
        // INVARIANT: Symbolic link inside side tree with no main tree counterpart.
        return Ok(None);
    };

    Ok(Some(placement))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| SurveyError::Read {
        source: err,
        path: path.to_path_buf(),
    })
}

/// Placement survey error types.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    /// Document cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SurveyError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{DocConfig, ExclusionMethod},
        ledger::Ledger,
    };
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::os::unix::fs::symlink;

    #[sealed_test]
    fn classify_every_placement() -> anyhow::Result<()> {
        let root = std::env::current_dir()?.canonicalize()?;
        for dir in [".docs/sub", "sub", ".git/info"] {
            fs::create_dir_all(root.join(dir))?;
        }
        let mut config = DocConfig::new("docs", ".docs", ExclusionMethod::Exclude);
        config.set_patterns(["CHANGELOG.md"]);
        let ledger = Ledger::for_method(ExclusionMethod::Exclude, &root, root.join(".git"));
        let ws = Workspace::from_parts(&root, root.join(".docs"), config, ledger)?;

        fs::write(".docs/linked.md", "l")?;
        symlink(".docs/linked.md", "linked.md")?;
        fs::write("main.md", "m")?;
        fs::write(".docs/sub/side.md", "s")?;
        fs::write("div.md", "1")?;
        fs::write(".docs/div.md", "2")?;
        fs::write("dup.md", "d")?;
        fs::write(".docs/dup.md", "d")?;
        fs::write(".docs/mis.md", "target")?;
        fs::write("elsewhere.md", "other")?;
        symlink("elsewhere.md", "mis.md")?;
        symlink(".docs/gone.md", "gone.md")?;
        fs::write("README.md", "root")?;
        fs::write("CHANGELOG.md", "excluded")?;

        let surveyed = survey(&ws)?;
        let result = surveyed
            .iter()
            .map(|doc| (doc.rel.to_string_lossy().into_owned(), doc.placement))
            .collect::<Vec<_>>();
        let expect = vec![
            ("div.md".to_string(), Placement::Divergent),
            ("dup.md".to_string(), Placement::Duplicated),
            ("elsewhere.md".to_string(), Placement::OnlyInMain),
            ("gone.md".to_string(), Placement::DanglingLink),
            ("linked.md".to_string(), Placement::Linked),
            ("main.md".to_string(), Placement::OnlyInMain),
            ("mis.md".to_string(), Placement::Misdirected),
            ("sub/side.md".to_string(), Placement::OnlyInSide),
        ];
        assert_eq!(result, expect);
        assert_eq!(tally(&surveyed).get(&Placement::OnlyInMain), Some(&2));

        Ok(())
    }
}
