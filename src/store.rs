// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration store management.
//!
//! The documentation configuration lives at the top-level of the side tree
//! in a file named `.oxidoc.json`, so it travels with the documentation
//! branch.
//!
//! Besides plain loading and saving, the store offers the one mutation the
//! configuration allows after setup: pattern management.

use crate::config::{ConfigError, DocConfig, PatternSet};

use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Name of configuration file at top-level of side tree.
pub const CONFIG_FILE: &str = ".oxidoc.json";

/// Handle to the configuration file of a side tree.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Construct new store handle for side tree at path.
    pub fn new(side_root: impl AsRef<Path>) -> Self {
        Self {
            config_path: side_root.as_ref().join(CONFIG_FILE),
        }
    }

    /// Path to configuration file.
    pub fn path(&self) -> &Path {
        self.config_path.as_path()
    }

    /// Check if configuration file exists.
    pub fn exists(&self) -> bool {
        self.config_path.is_file()
    }

    /// Load configuration.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Read`] if the file cannot be read.
    /// - Return [`StoreError::Config`] if the file is not a valid
    ///   configuration.
    pub fn load(&self) -> Result<DocConfig> {
        let data = read_to_string(&self.config_path).map_err(|err| StoreError::Read {
            source: err,
            config_path: self.config_path.clone(),
        })?;

        data.parse().map_err(|err| StoreError::Config {
            source: err,
            config_path: self.config_path.clone(),
        })
    }

    /// Save configuration, replacing whatever was there before.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Write`] if the file cannot be written.
    pub fn save(&self, config: &DocConfig) -> Result<()> {
        write(&self.config_path, config.to_string().as_bytes()).map_err(|err| StoreError::Write {
            source: err,
            config_path: self.config_path.clone(),
        })
    }

    /// Edit configuration in place.
    ///
    /// Loads configuration, hands it to editor, and writes it back only if
    /// the editor actually changed something. Returns whether a write
    /// occurred.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError`] variants of [`ConfigStore::load`] or
    ///   [`ConfigStore::save`].
    pub fn edit<E>(&self, editor: E) -> Result<bool>
    where
        E: FnOnce(&mut DocConfig) -> Result<()>,
    {
        let before = self.load()?;
        let mut after = before.clone();
        editor(&mut after)?;

        if after == before {
            return Ok(false);
        }

        self.save(&after)?;
        Ok(true)
    }

    /// Add exclusion patterns.
    ///
    /// Patterns already present are left alone. Insertion order is kept.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Config`] if any pattern is not a valid glob.
    #[instrument(skip(self, patterns), level = "debug")]
    pub fn add_patterns(&self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Result<bool> {
        let patterns = patterns.into_iter().map(Into::into).collect::<Vec<String>>();
        PatternSet::new(&patterns).map_err(|err| StoreError::Config {
            source: err,
            config_path: self.config_path.clone(),
        })?;

        self.edit(|config| {
            let mut current = config.patterns();
            for pattern in patterns {
                if !current.contains(&pattern) {
                    info!("add exclusion pattern {pattern:?}");
                    current.push(pattern);
                }
            }
            config.set_patterns(current);
            Ok(())
        })
    }

    /// Remove exclusion patterns.
    ///
    /// Patterns that are not present are reported and skipped.
    #[instrument(skip(self, patterns), level = "debug")]
    pub fn remove_patterns(
        &self,
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<bool> {
        self.edit(|config| {
            let mut current = config.patterns();
            for pattern in patterns {
                let pattern = pattern.as_ref();
                if let Some(index) = current.iter().position(|entry| entry == pattern) {
                    info!("remove exclusion pattern {pattern:?}");
                    current.remove(index);
                } else {
                    info!("exclusion pattern {pattern:?} not configured");
                }
            }
            config.set_patterns(current);
            Ok(())
        })
    }
}

/// Configuration store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Configuration file cannot be read.
    #[error("failed to read configuration at {:?}", config_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        config_path: PathBuf,
    },

    /// Configuration file cannot be written.
    #[error("failed to write configuration at {:?}", config_path.display())]
    Write {
        #[source]
        source: std::io::Error,
        config_path: PathBuf,
    },

    /// Configuration file content is invalid.
    #[error("invalid configuration at {:?}", config_path.display())]
    Config {
        #[source]
        source: ConfigError,
        config_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
