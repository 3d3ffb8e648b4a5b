//! Backup catalog
//!
//! Lists every backup of a game across all of its backup directories, or of
//! every game under the backup root.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::backup::archive::ArchiveStore;
use crate::backup::resolver::DirectoryResolver;
use crate::error::{VaultError, VaultResult};
use crate::models::{CatalogEntry, Container, ContainerKind};
use crate::storage::dir_size;

/// Enumerates and decorates backup records
pub struct BackupCatalog<'a, R: DirectoryResolver> {
    resolver: &'a R,
    store: ArchiveStore,
}

impl<'a, R: DirectoryResolver> BackupCatalog<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            store: ArchiveStore::new(),
        }
    }

    /// All backups of `game_id`, newest first
    ///
    /// Containers without readable metadata are left out.
    pub fn list(&self, game_id: &str) -> VaultResult<Vec<CatalogEntry>> {
        let dirs = self.resolver.find_all(game_id);
        if dirs.len() > 1 {
            let names: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
            warn!(game_id, dirs = ?names, "backups are split across several directories");
        }

        let mut entries: Vec<CatalogEntry> = dirs
            .iter()
            .flat_map(|dir| Container::scan_dir(dir))
            .filter_map(|container| self.describe(container))
            .collect();

        entries.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.path.cmp(&b.path)));
        debug!(game_id, count = entries.len(), "listed backups");
        Ok(entries)
    }

    /// The most recently modified container of `game_id`, whether or not its
    /// metadata can be read
    pub fn newest_container(&self, game_id: &str) -> Option<Container> {
        self.resolver
            .find_all(game_id)
            .iter()
            .flat_map(|dir| Container::scan_dir(dir))
            .map(|container| (container.modified(), container))
            .max_by(|(a_time, a), (b_time, b)| a_time.cmp(b_time).then(b.path.cmp(&a.path)))
            .map(|(_, container)| container)
    }

    /// Backups of every game under the root, newest `backup_time` first
    ///
    /// Every non-hidden directory under the root is scanned, whatever layout
    /// it follows. A missing root yields an empty list.
    pub fn scan_root(&self) -> VaultResult<Vec<CatalogEntry>> {
        let root = self.resolver.root();
        let dir_entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Io(format!(
                    "Failed to read backup root {}: {}",
                    root.display(),
                    e
                )))
            }
        };

        let mut dirs: Vec<PathBuf> = dir_entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let mut entries: Vec<CatalogEntry> = dirs
            .iter()
            .flat_map(|dir| Container::scan_dir(dir))
            .filter_map(|container| self.describe(container))
            .collect();

        entries.sort_by(|a, b| {
            b.record
                .backup_time
                .cmp(&a.record.backup_time)
                .then(a.path.cmp(&b.path))
        });
        debug!(root = %root.display(), count = entries.len(), "scanned backup root");
        Ok(entries)
    }

    fn describe(&self, container: Container) -> Option<CatalogEntry> {
        let record = self.store.read_metadata(&container)?;
        let size = match container.kind {
            ContainerKind::Archive => std::fs::metadata(&container.path)
                .map(|m| m.len())
                .unwrap_or(0),
            ContainerKind::Folder => dir_size(&container.path),
        };
        Some(CatalogEntry {
            record,
            is_compressed: container.is_archive(),
            modified: DateTime::<Local>::from(container.modified()),
            size,
            path: container.path,
        })
    }
}
