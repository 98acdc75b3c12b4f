// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Exclusion ledger handling.
//!
//! Documents that live in the side tree still show up as symbolic links in
//! the main tree. Git would happily track those links, which defeats the
//! whole point of moving documentation into its own branch. So oxidoc keeps
//! a __managed block__ inside an ignore-style file of the main tree that
//! lists everything Git should look past.
//!
//! # Managed Block Layout
//!
//! The managed block is delimited by two literal marker lines. Everything
//! between them belongs to oxidoc, and is regenerated from scratch on every
//! run. Everything outside of them belongs to the user, and is never touched.
//!
//! ```text
//! target/
//! # >>> oxidoc managed block >>>
//! .docs/
//! /a/README.md
//! /guide/install.md
//! # <<< oxidoc managed block <<<
//! ```
//!
//! The content of the block depends on the [`ExclusionMethod`]:
//!
//! - `exclude` writes to `$GIT_COMMON_DIR/info/exclude`, which Git never
//!   tracks. Each synced document gets its own literal entry, anchored at
//!   the top of the main tree with wildcard characters escaped, see
//!   [`literal_entry`].
//! - `gitignore` writes to the top-level `.gitignore`, which is shared with
//!   everyone. Listing every document there would churn the main branch, so
//!   a fixed set of patterns is used instead: ignore all markdown, then
//!   negate what must stay tracked.
//!
//! Block rewriting is done through pure functions over the file content,
//! see [`splice`].

use crate::{config::ExclusionMethod, path::to_slash};

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    io::ErrorKind,
    ops::Range,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Line that opens the managed block.
pub const BEGIN_MARKER: &str = "# >>> oxidoc managed block >>>";

/// Line that closes the managed block.
pub const END_MARKER: &str = "# <<< oxidoc managed block <<<";

/// Freshly generated managed block content.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ManagedBlock {
    entries: Vec<String>,
}

impl ManagedBlock {
    /// Construct block from raw entries.
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Generate block for the local exclusion method.
    ///
    /// Mount entry first, then one literal entry per path in sorted order.
    pub fn local<'a>(mount: Option<&Path>, paths: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        let mut entries = Vec::new();
        if let Some(mount) = mount {
            entries.push(mount_entry(mount));
        }

        let paths = paths.into_iter().map(|path| to_slash(path)).collect::<BTreeSet<_>>();
        entries.extend(paths.iter().map(literal_entry));

        Self { entries }
    }

    /// Generate block for the shared exclusion method.
    pub fn shared(
        mount: Option<&Path>,
        exclude_root_readme: bool,
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        let mut entries = Vec::new();
        if let Some(mount) = mount {
            entries.push(mount_entry(mount));
        }
        entries.push("*.md".into());
        if exclude_root_readme {
            entries.push(format!("!/{}", crate::path::ROOT_README));
        }
        for pattern in patterns {
            entries.push(format!("!{}", pattern.as_ref()));
        }

        Self { entries }
    }

    /// Listing of block entries without markers.
    pub fn entries(&self) -> &[String] {
        self.entries.as_slice()
    }
}

impl Display for ManagedBlock {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "{BEGIN_MARKER}")?;
        for entry in &self.entries {
            writeln!(fmt, "{entry}")?;
        }
        writeln!(fmt, "{END_MARKER}")
    }
}

/// Render ledger entry for side tree mount directory.
pub fn mount_entry(mount: impl AsRef<Path>) -> String {
    format!("{}/", to_slash(mount))
}

/// Render ledger entry matching exactly one path of the main tree.
///
/// A leading slash anchors the entry so a root-level name does not match at
/// every depth. Characters Git would read as wildcards, negation, or comment
/// syntax are backslash-escaped.
pub fn literal_entry(path: impl AsRef<Path>) -> String {
    let path = to_slash(path);
    let mut entry = String::with_capacity(path.len() + 1);
    entry.push('/');
    for ch in path.chars() {
        if matches!(ch, '\\' | '[' | ']' | '*' | '?' | '!' | '#') {
            entry.push('\\');
        }
        entry.push(ch);
    }

    entry
}

/// Path named by literal entry, relative to main tree.
///
/// Reverses [`literal_entry`]. Unanchored entries are read the same way.
pub fn entry_path(entry: &str) -> PathBuf {
    let entry = entry.trim();
    let entry = entry.strip_prefix('/').unwrap_or(entry);
    let entry = entry.strip_suffix('/').unwrap_or(entry);

    let mut path = String::with_capacity(entry.len());
    let mut chars = entry.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => path.extend(chars.next()),
            _ => path.push(ch),
        }
    }

    PathBuf::from(path)
}

/// Check if entry names a single literal path rather than a pattern.
///
/// Escaped wildcard characters do not make an entry a pattern. The mount
/// entry is structural and never counts as literal.
pub fn is_literal_entry(entry: &str, mount: Option<&str>) -> bool {
    let entry = entry.trim();
    if entry.is_empty() || entry.starts_with('#') || entry.starts_with('!') || Some(entry) == mount {
        return false;
    }

    let mut chars = entry.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '*' | '?' | '[' => return false,
            _ => {}
        }
    }

    true
}

/// Locate managed block by its markers.
///
/// Returns range of line indices covering both markers. A begin marker with
/// no end marker extends to the last line.
pub fn find_block<S: AsRef<str>>(lines: &[S]) -> Option<Range<usize>> {
    let begin = lines
        .iter()
        .position(|line| line.as_ref().trim_end() == BEGIN_MARKER)?;
    let end = lines[begin + 1..]
        .iter()
        .position(|line| line.as_ref().trim_end() == END_MARKER)
        .map(|offset| begin + 1 + offset + 1)
        .unwrap_or(lines.len());

    Some(begin..end)
}

/// Extract entries of managed block from file content.
///
/// Returns `None` if there is no managed block at all.
pub fn extract_entries(content: &str) -> Option<Vec<String>> {
    let lines = content.lines().collect::<Vec<_>>();
    let range = find_block(&lines)?;
    let entries = lines[range]
        .iter()
        .map(|line| line.trim_end())
        .filter(|line| *line != BEGIN_MARKER && *line != END_MARKER)
        .map(str::to_owned)
        .collect();

    Some(entries)
}

/// Replace managed block of file content.
///
/// Excises existing block, then appends new block at the end. Content
/// outside of the block is kept byte for byte. Splicing the same block into
/// its own output yields the output again.
pub fn splice(content: &str, block: &ManagedBlock) -> String {
    let lines = content.split_inclusive('\n').collect::<Vec<_>>();
    let mut out = String::with_capacity(content.len());

    match find_block(&lines) {
        Some(range) => {
            for line in &lines[..range.start] {
                out.push_str(line);
            }
            for line in &lines[range.end..] {
                out.push_str(line);
            }
        }
        None => out.push_str(content),
    }

    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(block.to_string().as_str());

    out
}

/// Drop target entries from managed block of file content.
///
/// Other lines keep their order and position. Content without a managed
/// block is returned as is.
pub fn remove_entries(content: &str, doomed: &BTreeSet<String>) -> String {
    let lines = content.split_inclusive('\n').collect::<Vec<_>>();
    let Some(range) = find_block(&lines) else {
        return content.to_string();
    };

    lines
        .iter()
        .enumerate()
        .filter(|(index, line)| {
            !(range.contains(index) && doomed.contains(line.trim_end()))
        })
        .map(|(_, line)| *line)
        .collect()
}

/// Handle to ignore-style file holding the managed block.
#[derive(Debug, Clone)]
pub struct Ledger {
    ledger_path: PathBuf,
}

impl Ledger {
    /// Construct new ledger handle for file at path.
    pub fn new(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
        }
    }

    /// Construct ledger handle for exclusion method.
    pub fn for_method(
        method: ExclusionMethod,
        main_root: impl AsRef<Path>,
        common_dir: impl AsRef<Path>,
    ) -> Self {
        match method {
            ExclusionMethod::Gitignore => Self::new(main_root.as_ref().join(".gitignore")),
            ExclusionMethod::Exclude => Self::new(common_dir.as_ref().join("info").join("exclude")),
        }
    }

    /// Path to ignore-style file.
    pub fn path(&self) -> &Path {
        self.ledger_path.as_path()
    }

    /// Read full file content.
    ///
    /// A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// - Return [`LedgerError::Read`] if the file exists but cannot be read.
    pub fn read(&self) -> Result<String> {
        match read_to_string(&self.ledger_path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(LedgerError::Read {
                source: err,
                ledger_path: self.ledger_path.clone(),
            }),
        }
    }

    /// Current entries of managed block.
    ///
    /// # Errors
    ///
    /// - Return [`LedgerError::Read`] if the file cannot be read.
    pub fn entries(&self) -> Result<Vec<String>> {
        Ok(extract_entries(&self.read()?).unwrap_or_default())
    }

    /// Regenerate managed block.
    ///
    /// Returns whether the file content changed. Nothing is written when the
    /// content is already up to date, or when `dry_run` is set.
    ///
    /// # Errors
    ///
    /// - Return [`LedgerError::Read`] if the file cannot be read.
    /// - Return [`LedgerError::Write`] if the file cannot be written.
    pub fn rewrite(&self, block: &ManagedBlock, dry_run: bool) -> Result<bool> {
        let before = self.read()?;
        let after = splice(&before, block);
        self.commit(before, after, dry_run)
    }

    /// Remove target entries from managed block.
    ///
    /// # Errors
    ///
    /// - Return [`LedgerError::Read`] if the file cannot be read.
    /// - Return [`LedgerError::Write`] if the file cannot be written.
    pub fn remove(&self, doomed: &BTreeSet<String>, dry_run: bool) -> Result<bool> {
        let before = self.read()?;
        let after = remove_entries(&before, doomed);
        self.commit(before, after, dry_run)
    }

    fn commit(&self, before: String, after: String, dry_run: bool) -> Result<bool> {
        if before == after {
            debug!("{:?} already up to date", self.ledger_path.display());
            return Ok(false);
        }

        if dry_run {
            info!("would rewrite managed block of {:?}", self.ledger_path.display());
            return Ok(true);
        }

        // INVARIANT: The `info/` directory may not exist in fresh repositories.
        if let Some(parent) = self.ledger_path.parent() {
            mkdirp::mkdirp(parent).map_err(|err| LedgerError::Write {
                source: err,
                ledger_path: self.ledger_path.clone(),
            })?;
        }

        info!("rewrite managed block of {:?}", self.ledger_path.display());
        write(&self.ledger_path, after.as_bytes()).map_err(|err| LedgerError::Write {
            source: err,
            ledger_path: self.ledger_path.clone(),
        })?;

        Ok(true)
    }
}

/// Exclusion ledger error types.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Ignore-style file cannot be read from.
    #[error("failed to read from ledger at {:?}", ledger_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        ledger_path: PathBuf,
    },

    /// Ignore-style file cannot be written to.
    #[error("failed to write to ledger at {:?}", ledger_path.display())]
    Write {
        #[source]
        source: std::io::Error,
        ledger_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
