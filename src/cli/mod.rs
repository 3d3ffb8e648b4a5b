//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup engine and settings.

pub mod backup;
pub mod collection;
pub mod game;

use crate::backup::BackupEngine;
use crate::config::{Settings, VaultPaths};
use crate::error::VaultResult;

pub use backup::{handle_backup_command, BackupCommands};
pub use collection::{handle_collection_command, CollectionCommands};
pub use game::{handle_game_command, GameCommands};

/// Resolved paths and loaded settings shared by every command
pub struct CliContext {
    pub paths: VaultPaths,
    pub settings: Settings,
}

impl CliContext {
    pub fn new(paths: VaultPaths, settings: Settings) -> Self {
        Self { paths, settings }
    }

    /// Engine configured from the settings
    pub fn engine(&self) -> VaultResult<BackupEngine> {
        Ok(BackupEngine::new(
            self.settings.backup_root(&self.paths),
            self.settings.max_backups,
        )?
        .with_format(self.settings.container_format()))
    }

    /// Persist the settings after a change
    pub fn save_settings(&self) -> VaultResult<()> {
        self.settings.save(&self.paths)
    }
}
