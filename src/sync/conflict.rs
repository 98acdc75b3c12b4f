// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Conflict resolution.
//!
//! A __conflict__ happens when the same document exists as a regular file in
//! both trees, and the two copies do not agree byte for byte. Someone has to
//! decide which copy survives before the main tree copy can be replaced by a
//! link.
//!
//! # Resolution Modes
//!
//! [`AutoResolve`] never blocks: the main tree copy is renamed out of the
//! way with a `.bak` suffix, and the side tree copy is kept as canonical.
//!
//! [`PromptResolve`] asks a [`ChoiceSource`] until it gets a terminal answer.
//! The prompt loop is an explicit state machine, see [`PromptState`].
//!
//! Deciding and applying are kept apart. A [`Resolve`] only picks a
//! [`Resolution`]. [`apply`] then carries it out through [`FileOps`].

use crate::{
    fsops::{FileOps, FsError},
    path::unique_backup_path,
};

use indicatif::ProgressBar;
use inquire::Text;
use similar::TextDiff;
use std::{
    collections::VecDeque,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info, warn};

/// Document that diverges between trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Path relative to both tree roots.
    pub rel: PathBuf,

    /// Regular file in main tree.
    pub main_path: PathBuf,

    /// Regular file in side tree.
    pub side_path: PathBuf,
}

impl Conflict {
    /// Construct new conflict.
    pub fn new(rel: impl Into<PathBuf>, main_path: impl Into<PathBuf>, side_path: impl Into<PathBuf>) -> Self {
        Self {
            rel: rel.into(),
            main_path: main_path.into(),
            side_path: side_path.into(),
        }
    }

    /// Render unified diff from main tree copy to side tree copy.
    ///
    /// # Errors
    ///
    /// - Return [`ConflictError::Read`] if either copy cannot be read.
    pub fn diff(&self) -> Result<String> {
        let main = read_lossy(&self.main_path)?;
        let side = read_lossy(&self.side_path)?;
        let rel = self.rel.display().to_string();
        let main_header = format!("main/{rel}");
        let side_header = format!("side/{rel}");

        let diff = TextDiff::from_lines(main.as_str(), side.as_str());
        let text = diff
            .unified_diff()
            .context_radius(3)
            .header(&main_header, &side_header)
            .to_string();

        Ok(text)
    }
}

/// Action that ends in a link to the side tree copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Overwrite side tree copy with main tree copy.
    KeepMain,

    /// Drop main tree copy.
    KeepSide,

    /// Save both copies under backup names, keep side tree copy.
    BackupBoth,

    /// Rename main tree copy with backup suffix, keep side tree copy.
    BackupMain,
}

/// Outcome of deciding on a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Carry out action, then link.
    Apply(Action),

    /// Leave both copies alone. No link is created.
    Skip,
}

/// Raw choice offered by the interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    ShowDiff,
    KeepMain,
    KeepSide,
    Skip,
    BackupBoth,
}

impl Choice {
    /// Help line listing every choice.
    pub const HELP: &'static str =
        "1) show diff  2) keep main  3) keep side  4) skip  5) back up both";
}

impl FromStr for Choice {
    type Err = InvalidChoice;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "diff" => Ok(Self::ShowDiff),
            "2" | "main" => Ok(Self::KeepMain),
            "3" | "side" => Ok(Self::KeepSide),
            "4" | "skip" => Ok(Self::Skip),
            "5" | "both" => Ok(Self::BackupBoth),
            _ => Err(InvalidChoice(input.to_string())),
        }
    }
}

/// Input that does not name any choice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid choice {0:?}, expected one of: {HELP}", HELP = Choice::HELP)]
pub struct InvalidChoice(pub String);

/// State of the interactive prompt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    /// Waiting for user input.
    AwaitChoice,

    /// Diff must be shown before asking again.
    ShowDiff,

    /// Terminal: action picked.
    Resolved(Action),

    /// Terminal: document stays divergent.
    Skipped,
}

impl PromptState {
    /// Feed user input to the state machine.
    ///
    /// Only [`PromptState::AwaitChoice`] consumes input, every other state is
    /// returned as is.
    ///
    /// # Errors
    ///
    /// - Return [`InvalidChoice`] if input names no choice. The caller is
    ///   expected to stay in [`PromptState::AwaitChoice`].
    pub fn on_input(self, input: &str) -> Result<Self, InvalidChoice> {
        if self != Self::AwaitChoice {
            return Ok(self);
        }

        let state = match input.parse::<Choice>()? {
            Choice::ShowDiff => Self::ShowDiff,
            Choice::KeepMain => Self::Resolved(Action::KeepMain),
            Choice::KeepSide => Self::Resolved(Action::KeepSide),
            Choice::Skip => Self::Skipped,
            Choice::BackupBoth => Self::Resolved(Action::BackupBoth),
        };

        Ok(state)
    }

    /// Transition after diff was shown.
    pub fn after_diff(self) -> Self {
        match self {
            Self::ShowDiff => Self::AwaitChoice,
            other => other,
        }
    }

    /// Resolution of a terminal state.
    pub fn resolution(self) -> Option<Resolution> {
        match self {
            Self::Resolved(action) => Some(Resolution::Apply(action)),
            Self::Skipped => Some(Resolution::Skip),
            Self::AwaitChoice | Self::ShowDiff => None,
        }
    }
}

impl Display for PromptState {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::AwaitChoice => fmt.write_str("await choice"),
            Self::ShowDiff => fmt.write_str("show diff"),
            Self::Resolved(action) => write!(fmt, "resolved with {action:?}"),
            Self::Skipped => fmt.write_str("skipped"),
        }
    }
}

/// Source of interactive choices.
pub trait ChoiceSource {
    /// Ask for one line of input about a conflict.
    fn ask(&mut self, conflict: &Conflict) -> Result<String>;

    /// Show text to the user.
    fn show(&mut self, text: &str);

    /// Tell the user their input was rejected.
    fn reject(&mut self, error: &InvalidChoice);
}

/// Choices read from the terminal.
///
/// Suspends the progress bar while waiting on the user.
#[derive(Debug, Clone)]
pub struct TerminalChoices {
    bar: ProgressBar,
}

impl TerminalChoices {
    /// Construct new terminal choice source.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl ChoiceSource for TerminalChoices {
    fn ask(&mut self, conflict: &Conflict) -> Result<String> {
        let message = format!("{} differs between trees", conflict.rel.display());
        self.bar
            .suspend(|| Text::new(&message).with_help_message(Choice::HELP).prompt())
            .map_err(ConflictError::Prompt)
    }

    fn show(&mut self, text: &str) {
        self.bar.suspend(|| println!("{text}"));
    }

    fn reject(&mut self, error: &InvalidChoice) {
        self.bar.suspend(|| warn!("{error}"));
    }
}

/// Choices replayed from a fixed script.
///
/// Records everything shown and rejected for later inspection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChoices {
    inputs: VecDeque<String>,
    pub shown: Vec<String>,
    pub rejected: Vec<String>,
}

impl ScriptedChoices {
    /// Construct new scripted choice source.
    pub fn new(inputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl ChoiceSource for ScriptedChoices {
    fn ask(&mut self, _conflict: &Conflict) -> Result<String> {
        self.inputs.pop_front().ok_or(ConflictError::InputExhausted)
    }

    fn show(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }

    fn reject(&mut self, error: &InvalidChoice) {
        self.rejected.push(error.0.clone());
    }
}

/// Decide what to do with a conflict.
pub trait Resolve {
    fn resolve(&mut self, conflict: &Conflict) -> Result<Resolution>;
}

impl<R: Resolve + ?Sized> Resolve for Box<R> {
    fn resolve(&mut self, conflict: &Conflict) -> Result<Resolution> {
        (**self).resolve(conflict)
    }
}

/// Deterministic resolution. Never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoResolve;

impl Resolve for AutoResolve {
    fn resolve(&mut self, conflict: &Conflict) -> Result<Resolution> {
        debug!("auto resolve {:?} in favour of side tree", conflict.rel.display());
        Ok(Resolution::Apply(Action::BackupMain))
    }
}

/// Interactive resolution through a [`ChoiceSource`].
#[derive(Debug, Clone)]
pub struct PromptResolve<C: ChoiceSource> {
    source: C,
}

impl<C: ChoiceSource> PromptResolve<C> {
    /// Construct new interactive resolver.
    pub fn new(source: C) -> Self {
        Self { source }
    }

    /// Give back choice source.
    pub fn into_inner(self) -> C {
        self.source
    }
}

impl<C: ChoiceSource> Resolve for PromptResolve<C> {
    fn resolve(&mut self, conflict: &Conflict) -> Result<Resolution> {
        let mut state = PromptState::AwaitChoice;
        loop {
            if let Some(resolution) = state.resolution() {
                debug!("{:?} {state}", conflict.rel.display());
                return Ok(resolution);
            }

            state = match state {
                PromptState::ShowDiff => {
                    self.source.show(&conflict.diff()?);
                    state.after_diff()
                }
                _ => {
                    let input = self.source.ask(conflict)?;
                    match state.on_input(&input) {
                        Ok(next) => next,
                        Err(error) => {
                            self.source.reject(&error);
                            state
                        }
                    }
                }
            };
        }
    }
}

/// Result of carrying out a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// Caller should replace main tree copy with a link.
    pub link: bool,

    /// Number of backup files written.
    pub backups: usize,
}

/// Carry out a resolution.
///
/// Whenever the resolution ends in a link, the main tree copy is gone
/// afterwards (outside of dry runs), so the caller can place the link.
///
/// # Errors
///
/// - Return [`ConflictError::Fs`] if any file operation fails.
pub fn apply(conflict: &Conflict, resolution: Resolution, ops: &FileOps) -> Result<Applied> {
    let main = conflict.main_path.as_path();
    let side = conflict.side_path.as_path();

    let backups = match resolution {
        Resolution::Skip => {
            info!("leave {:?} divergent", conflict.rel.display());
            return Ok(Applied {
                link: false,
                backups: 0,
            });
        }
        Resolution::Apply(Action::BackupMain) => {
            ops.rename(main, &unique_backup_path(main, ".bak"))?;
            1
        }
        Resolution::Apply(Action::KeepMain) => {
            ops.copy_file(main, side)?;
            ops.remove_file(main)?;
            0
        }
        Resolution::Apply(Action::KeepSide) => {
            ops.remove_file(main)?;
            0
        }
        Resolution::Apply(Action::BackupBoth) => {
            ops.copy_file(main, &unique_backup_path(main, ".main.bak"))?;
            ops.copy_file(side, &unique_backup_path(main, ".side.bak"))?;
            ops.remove_file(main)?;
            2
        }
    };

    Ok(Applied { link: true, backups })
}

fn read_lossy(path: &Path) -> Result<String> {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|err| ConflictError::Read {
            source: err,
            path: path.to_path_buf(),
        })
}

/// Conflict resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    /// Terminal prompt fails or is interrupted.
    #[error(transparent)]
    Prompt(#[from] inquire::InquireError),

    /// Scripted input ran out before a terminal choice was made.
    #[error("ran out of input before conflict was resolved")]
    InputExhausted,

    /// Either copy of a document cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// File operation fails while applying a resolution.
    #[error(transparent)]
    Fs(#[from] FsError),
}

impl ConflictError {
    /// Check if error must abort the whole run.
    ///
    /// Failing to talk to the user is fatal. Failing on a single file is not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Prompt(_) | Self::InputExhausted)
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConflictError> = std::result::Result<T, E>;
