// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use oxidoc::{
    cleanup::{AuditScope, Auditor},
    survey::{survey, tally, Placement},
    sync::{
        conflict::{PromptResolve, TerminalChoices},
        Direction, Reconciler, SyncError, SyncOptions, SyncReport,
    },
    vcs::{Git2Client, VcsClient},
    watch::DocWatch,
    workspace::Workspace,
};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    collections::BTreeSet,
    env::current_dir,
    io::{stdin, IsTerminal},
    path::PathBuf,
    process::exit,
    time::Duration,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "oxidoc [options] <oxidoc-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Show debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Run as if oxidoc was started in given directory.
    #[arg(short = 'C', global = true, value_name = "dir")]
    pub directory: Option<PathBuf>,

    /// Path to documentation worktree, relative to main tree.
    #[arg(long, global = true, value_name = "path")]
    pub worktree: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let context = Context {
            directory: self.directory,
            worktree: self.worktree,
            quiet: self.quiet,
        };

        match self.command {
            Command::Sync(opts) => run_sync(&context, opts),
            Command::Cleanup(opts) => run_cleanup(&context, opts),
            Command::Status => run_status(&context),
            Command::Patterns(opts) => run_patterns(&context, opts),
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.verbose {
            EnvFilter::new("debug")
        } else if self.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Move documents into documentation worktree and link them back.
    #[command(override_usage = "oxidoc sync [options]")]
    Sync(SyncArgs),

    /// Remove dangling links and stale ignore entries.
    #[command(override_usage = "oxidoc cleanup [options]")]
    Cleanup(CleanupArgs),

    /// Show placement of every document.
    #[command(override_usage = "oxidoc status [options]")]
    Status,

    /// Manage exclusion patterns.
    #[command(subcommand)]
    Patterns(PatternsCommand),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncArgs {
    /// Report what would change without changing anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Run cleanup before syncing.
    #[arg(short, long)]
    pub cleanup: bool,

    /// Keep syncing whenever documents change.
    #[arg(short, long, conflicts_with = "dry_run")]
    pub watch: bool,

    /// Never prompt on conflicts, back up main tree copy instead.
    #[arg(long)]
    pub no_interactive: bool,

    /// Passes to run.
    #[arg(long, value_enum, default_value_t = DirectionArg::Both, value_name = "direction")]
    pub direction: DirectionArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    /// Main tree to documentation worktree and back.
    Both,

    /// Main tree to documentation worktree only.
    ToSide,

    /// Documentation worktree to main tree only.
    ToMain,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Both => Self::Both,
            DirectionArg::ToSide => Self::ToSide,
            DirectionArg::ToMain => Self::ToMain,
        }
    }
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CleanupArgs {
    /// Only handle dangling links.
    #[arg(long, group = "scope")]
    pub dangling: bool,

    /// Only handle stale ignore entries.
    #[arg(long, group = "scope")]
    pub stale: bool,

    /// Handle everything.
    #[arg(long, group = "scope")]
    pub all: bool,

    /// Report issues without repairing them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl CleanupArgs {
    fn scope(&self) -> AuditScope {
        if self.dangling {
            AuditScope::Dangling
        } else if self.stale {
            AuditScope::Stale
        } else {
            AuditScope::All
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum PatternsCommand {
    /// List exclusion patterns.
    List,

    /// Add exclusion patterns.
    Add {
        /// Basename globs to exclude from syncing.
        #[arg(required = true, value_name = "pattern")]
        patterns: Vec<String>,
    },

    /// Remove exclusion patterns.
    Remove {
        /// Basename globs to stop excluding.
        #[arg(required = true, value_name = "pattern")]
        patterns: Vec<String>,
    },
}

struct Context {
    directory: Option<PathBuf>,
    worktree: Option<PathBuf>,
    quiet: bool,
}

impl Context {
    fn vcs(&self) -> Result<Git2Client> {
        let start = match &self.directory {
            Some(directory) => directory.clone(),
            None => current_dir()?,
        };

        Ok(Git2Client::discover(start)?)
    }

    fn open(&self, vcs: &impl VcsClient) -> Result<Workspace> {
        Ok(Workspace::open(vcs, self.worktree.as_deref())?)
    }

    fn spinner(&self) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {elapsed_precise:.green}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

fn main() {
    let cli = Cli::parse();
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    tracing_subscriber::registry()
        .with(layer)
        .with(cli.filter())
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run_sync(context: &Context, opts: SyncArgs) -> Result<()> {
    let vcs = context.vcs()?;
    let workspace = context.open(&vcs)?;
    let options = SyncOptions {
        dry_run: opts.dry_run,
        cleanup: opts.cleanup,
        direction: opts.direction.into(),
    };
    let interactive = !opts.no_interactive && !opts.dry_run && stdin().is_terminal();

    sync_once(context, &workspace, options, interactive)?;
    if opts.watch {
        DocWatch::new(workspace.main_root())
            .run(|| sync_once(context, &workspace, options, interactive).map(|_| ()))?;
    }

    Ok(())
}

fn sync_once(
    context: &Context,
    workspace: &Workspace,
    options: SyncOptions,
    interactive: bool,
) -> Result<SyncReport, SyncError> {
    let bar = context.spinner();
    let report = if interactive {
        let resolver = PromptResolve::new(TerminalChoices::new(bar.clone()));
        Reconciler::with_resolver(workspace, options, resolver)
            .with_progress(bar)
            .run()?
    } else {
        Reconciler::new(workspace, options).with_progress(bar).run()?
    };

    log_report(&report, options.dry_run);
    Ok(report)
}

fn log_report(report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "dry run: " } else { "" };
    info!("{prefix}{report}");
    for rel in &report.divergent {
        warn!("{:?} left divergent", rel.display());
    }
    for (rel, reason) in &report.errors {
        warn!("{:?} failed: {reason}", rel.display());
    }
}

fn run_cleanup(context: &Context, opts: CleanupArgs) -> Result<()> {
    let vcs = context.vcs()?;
    let workspace = context.open(&vcs)?;
    let report = Auditor::new(&workspace).audit(opts.scope(), opts.dry_run)?;

    for rel in &report.dangling.found {
        info!("dangling link {:?}", rel.display());
    }
    for entry in &report.stale.found {
        info!("stale entry {entry:?}");
    }
    info!(
        "repaired {} issue(s), {} failed",
        report.repaired(),
        report.failed()
    );

    if report.needs_attention() {
        return Err(anyhow!(
            "{} dangling link(s) and {} unrepaired issue(s) remain",
            report.dangling.found.len() - report.dangling.repaired,
            report.failed()
        ));
    }

    Ok(())
}

fn run_status(context: &Context) -> Result<()> {
    let vcs = context.vcs()?;
    let workspace = context.open(&vcs)?;
    let surveyed = survey(&workspace)?;

    info!("main tree: {:?}", workspace.main_root().display());
    info!(
        "documentation worktree: {:?} on branch {:?}",
        workspace.side_root().display(),
        workspace.config().branch
    );
    for (placement, count) in tally(&surveyed) {
        info!("{placement}: {count}");
    }
    for doc in surveyed.iter().filter(|doc| doc.placement != Placement::Linked) {
        info!("  {}: {:?}", doc.placement, doc.rel.display());
    }

    log_ledger_state(&workspace, &surveyed.iter().map(|doc| doc.rel.clone()).collect())?;

    let changes = vcs.status(workspace.side_root())?;
    if changes.is_empty() {
        info!("documentation worktree is clean");
    } else {
        info!("documentation worktree has {} uncommitted change(s)", changes.len());
        for change in changes {
            info!("  {:?}: {:?}", change.state, change.path.display());
        }
    }

    Ok(())
}

fn log_ledger_state(workspace: &Workspace, managed: &BTreeSet<PathBuf>) -> Result<()> {
    let ledger = workspace.ledger();
    let current = ledger.entries()?;
    let expect = workspace.managed_block(managed);

    if current.is_empty() {
        info!("managed block of {:?} missing", ledger.path().display());
    } else if current.as_slice() == expect.entries() {
        info!("managed block of {:?} up to date", ledger.path().display());
    } else {
        info!("managed block of {:?} out of date, run sync", ledger.path().display());
    }

    Ok(())
}

fn run_patterns(context: &Context, command: PatternsCommand) -> Result<()> {
    let vcs = context.vcs()?;
    let workspace = context.open(&vcs)?;
    let store = workspace.store();

    let changed = match command {
        PatternsCommand::List => {
            let patterns = workspace.config().patterns();
            if patterns.is_empty() {
                info!("no exclusion patterns configured");
            }
            for pattern in patterns {
                info!("{pattern}");
            }
            return Ok(());
        }
        PatternsCommand::Add { patterns } => store.add_patterns(patterns)?,
        PatternsCommand::Remove { patterns } => store.remove_patterns(patterns)?,
    };

    if changed {
        info!("exclusion patterns updated, run `oxidoc sync` to apply them");
    }

    Ok(())
}
