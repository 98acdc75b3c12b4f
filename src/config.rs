// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the documentation configuration file that oxidoc
//! keeps at the top-level of the side tree. File I/O is left to the
//! [`store`](crate::store) module to figure out.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Documentation configuration layout.
///
/// Every side tree carries exactly one configuration file. It is written once
/// when the documentation branch is set up, and is only ever changed
/// afterwards through pattern management.
///
/// # General Layout
///
/// ```json
/// {
///   "branch": "docs",
///   "worktree": ".docs",
///   "exclusion_method": "exclude",
///   "exclude_root_readme": true,
///   "exclude_patterns": "CHANGELOG.md,LICENSE.md"
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DocConfig {
    /// Name of the orphan branch holding documentation.
    pub branch: String,

    /// Path of side tree relative to the main tree.
    pub worktree: WorktreePath,

    /// Ignore-style file that holds the managed block.
    pub exclusion_method: ExclusionMethod,

    /// Keep root README tracked in the main tree.
    #[serde(default = "default_true")]
    pub exclude_root_readme: bool,

    /// Comma-separated basename globs that are never mirrored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<String>,
}

impl DocConfig {
    /// Construct new configuration with no exclusion patterns.
    pub fn new(
        branch: impl Into<String>,
        worktree: impl Into<PathBuf>,
        exclusion_method: ExclusionMethod,
    ) -> Self {
        Self {
            branch: branch.into(),
            worktree: WorktreePath::new(worktree),
            exclusion_method,
            exclude_root_readme: true,
            exclude_patterns: None,
        }
    }

    /// List configured exclusion patterns in the order they were given.
    ///
    /// Blank entries between commas are dropped.
    pub fn patterns(&self) -> Vec<String> {
        self.exclude_patterns
            .as_deref()
            .map(split_patterns)
            .unwrap_or_default()
    }

    /// Replace configured exclusion patterns.
    ///
    /// An empty listing clears the field entirely.
    pub fn set_patterns(&mut self, patterns: impl IntoIterator<Item = impl Into<String>>) {
        let patterns = patterns.into_iter().map(Into::into).collect::<Vec<String>>();
        self.exclude_patterns = if patterns.is_empty() {
            None
        } else {
            Some(patterns.join(","))
        };
    }

    /// Compile exclusion patterns into a matcher.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Pattern`] if any pattern is not a valid glob.
    pub fn pattern_set(&self) -> Result<PatternSet> {
        PatternSet::new(self.patterns())
    }
}

impl FromStr for DocConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: DocConfig = serde_json::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on worktree field.
        config.worktree = WorktreePath::new(
            shellexpand::full(config.worktree.to_string().as_str())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );

        // INVARIANT: Reject bad globs at load time, not halfway through a sync.
        config.pattern_set()?;

        Ok(config)
    }
}

impl Display for DocConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut data = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        data.push('\n');
        fmt.write_str(data.as_str())
    }
}

/// Ignore-style file used to keep documents out of the main tree's history.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionMethod {
    /// Shared `.gitignore` at the top-level of the main tree. Tracked.
    Gitignore,

    /// Repository-local `info/exclude` file. Never tracked.
    #[default]
    Exclude,
}

impl Display for ExclusionMethod {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Gitignore => fmt.write_str("gitignore"),
            Self::Exclude => fmt.write_str("exclude"),
        }
    }
}

/// Path of the side tree relative to the main tree.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct WorktreePath(PathBuf);

impl WorktreePath {
    /// Construct new worktree path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat worktree path as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for WorktreePath {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Compiled listing of exclusion patterns.
///
/// Patterns only ever match against the basename of a document, never the
/// full relative path.
#[derive(Debug, Default, Clone)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile a listing of glob patterns.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Pattern`] if any pattern is not a valid glob.
    pub fn new(patterns: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self> {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                Pattern::new(pattern.as_ref()).map_err(|source| ConfigError::Pattern {
                    source,
                    pattern: pattern.as_ref().to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Check if basename of path matches any pattern.
    pub fn is_excluded(&self, path: impl AsRef<Path>) -> bool {
        let Some(name) = path.as_ref().file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        self.patterns.iter().any(|pattern| pattern.matches(&name))
    }
}

fn split_patterns(data: &str) -> Vec<String> {
    data.split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_owned)
        .collect()
}

fn default_true() -> bool {
    true
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(serde_json::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(serde_json::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Exclusion pattern is not a valid glob.
    #[error("invalid exclusion pattern {pattern:?}")]
    Pattern {
        #[source]
        source: glob::PatternError,
        pattern: String,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    #[sealed_test(env = [("DOCS_HOME", ".docs")])]
    fn deserialize_doc_config() -> anyhow::Result<()> {
        let result: DocConfig = r#"
            {
                "branch": "docs",
                "worktree": "$DOCS_HOME",
                "exclusion_method": "gitignore",
                "exclude_root_readme": false,
                "exclude_patterns": "CHANGELOG.md, ,LICENSE*"
            }
        "#
        .parse()?;

        let expect = DocConfig {
            branch: "docs".into(),
            worktree: WorktreePath::new(".docs"),
            exclusion_method: ExclusionMethod::Gitignore,
            exclude_root_readme: false,
            exclude_patterns: Some("CHANGELOG.md, ,LICENSE*".into()),
        };
        assert_eq!(result, expect);
        assert_eq!(result.patterns(), vec!["CHANGELOG.md", "LICENSE*"]);

        Ok(())
    }

    #[test]
    fn deserialize_doc_config_defaults() -> anyhow::Result<()> {
        let result: DocConfig =
            r#"{ "branch": "docs", "worktree": ".docs", "exclusion_method": "exclude" }"#.parse()?;

        assert!(result.exclude_root_readme);
        assert_eq!(result.exclude_patterns, None);
        assert!(result.patterns().is_empty());

        Ok(())
    }

    #[test]
    fn deserialize_doc_config_rejects_bad_input() {
        let unknown_method = r#"{ "branch": "docs", "worktree": ".docs", "exclusion_method": "both" }"#;
        assert!(matches!(
            unknown_method.parse::<DocConfig>(),
            Err(ConfigError::Deserialize(_))
        ));

        let bad_pattern = r#"{
            "branch": "docs",
            "worktree": ".docs",
            "exclusion_method": "exclude",
            "exclude_patterns": "[oops"
        }"#;
        assert!(matches!(
            bad_pattern.parse::<DocConfig>(),
            Err(ConfigError::Pattern { .. })
        ));
    }

    #[test]
    fn serialize_doc_config() {
        let mut config = DocConfig::new("docs", ".docs", ExclusionMethod::Exclude);
        config.set_patterns(["CHANGELOG.md", "LICENSE*"]);

        let expect = indoc! {r#"
            {
              "branch": "docs",
              "worktree": ".docs",
              "exclusion_method": "exclude",
              "exclude_root_readme": true,
              "exclude_patterns": "CHANGELOG.md,LICENSE*"
            }
        "#};
        assert_eq!(config.to_string(), expect);

        config.set_patterns(Vec::<String>::new());
        assert!(!config.to_string().contains("exclude_patterns"));
    }

    #[test_case("CHANGELOG.md", true; "literal basename")]
    #[test_case("docs/CHANGELOG.md", true; "nested basename")]
    #[test_case("LICENSE-MIT.md", true; "glob basename")]
    #[test_case("CHANGELOG.md/README.md", false; "directory name is not matched")]
    #[test_case("guide.md", false; "unrelated")]
    #[test]
    fn pattern_set_matches_basename_only(path: &str, expect: bool) {
        let patterns = PatternSet::new(["CHANGELOG.md", "LICENSE*"]).unwrap();
        pretty_assertions::assert_eq!(patterns.is_excluded(path), expect);
    }
}
