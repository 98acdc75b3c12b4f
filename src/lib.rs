// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep markdown documentation on its own branch, visible everywhere.
//!
//! Oxidoc splits a Git repository into two checkouts. The __main tree__ is
//! the primary working tree holding source code. The __side tree__ is a
//! linked worktree of an orphan documentation branch, usually mounted inside
//! the main tree. Every markdown file lives as a regular file in the side tree
//! and shows up in the main tree as a relative symbolic link, while an
//! ignore-style file keeps Git on the main branch from ever tracking those
//! links.
//!
//! # Components
//!
//! - [`workspace`] figures out where both trees live and checks
//!   preconditions.
//! - [`sync`] moves documents into the side tree and links them back.
//! - [`ledger`] maintains the managed block of ignore entries.
//! - [`cleanup`] repairs dangling links and stale entries.
//! - [`survey`] classifies documents without touching anything.
//! - [`watch`] re-runs reconciliation on file changes.

pub mod cleanup;
pub mod config;
pub mod fsops;
pub mod ledger;
pub mod path;
pub mod store;
pub mod survey;
pub mod sync;
pub mod vcs;
pub mod watch;
pub mod workspace;
