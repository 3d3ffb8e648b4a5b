//! Backup engine
//!
//! Ties the hasher, resolver, archive store, retention, catalog and restore
//! together into the operations callers use: back up, list, restore, rename
//! and delete.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use crate::backup::archive::{ArchiveStore, ContainerFormat};
use crate::backup::catalog::BackupCatalog;
use crate::backup::hasher::hash_tree;
use crate::backup::resolver::{DirectoryResolver, GameDirectoryResolver};
use crate::backup::restore::{RestoreManager, RestoreReport};
use crate::backup::retention::RetentionPolicy;
use crate::config::env::expand_path;
use crate::error::{VaultError, VaultResult};
use crate::models::record::normalize_collection_id;
use crate::models::{BackupRecord, CatalogEntry, Container, ContainerKind, ContentHash};
use crate::storage::{dir_size, remove_path};

/// Retention settings for the collection a backup goes into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionSetting {
    pub enabled: bool,
    /// `None` uses the engine's default
    pub limit: Option<i64>,
}

impl RetentionSetting {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn keep(limit: i64) -> Self {
        Self {
            enabled: true,
            limit: Some(limit),
        }
    }
}

/// Everything needed to back up one game
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub game_id: String,
    pub game_name: String,
    /// Source directory; environment variables are expanded
    pub source_path: String,
    /// Write a new backup even when nothing changed
    pub force: bool,
    pub display_name: Option<String>,
    /// Empty means the default collection
    pub collection_id: String,
    pub retention: RetentionSetting,
}

impl BackupRequest {
    pub fn new(
        game_id: impl Into<String>,
        game_name: impl Into<String>,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            game_name: game_name.into(),
            source_path: source_path.into(),
            force: false,
            display_name: None,
            collection_id: String::new(),
            retention: RetentionSetting::disabled(),
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = collection_id.into();
        self
    }

    pub fn retention(mut self, retention: RetentionSetting) -> Self {
        self.retention = retention;
        self
    }
}

/// Details of a freshly written backup
#[derive(Debug, Clone, Serialize)]
pub struct BackupSummary {
    pub path: PathBuf,
    pub backup_name: String,
    pub timestamp: NaiveDateTime,
    pub display_name: String,
    pub collection_id: String,
    pub content_hash: ContentHash,
    /// Archive size, or byte total for folder backups
    pub compressed_size: u64,
    /// Containers removed by retention afterwards
    pub evicted: Vec<PathBuf>,
}

/// What `backup_game` did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BackupOutcome {
    Created(BackupSummary),
    /// The source matches the most recent backup
    Skipped {
        content_hash: ContentHash,
        latest: PathBuf,
    },
}

impl BackupOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn content_hash(&self) -> &ContentHash {
        match self {
            Self::Created(summary) => &summary.content_hash,
            Self::Skipped { content_hash, .. } => content_hash,
        }
    }
}

/// Success flag plus optional error, for callers that want a flat report
/// instead of a `Result`
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> From<VaultResult<T>> for OperationReport<T> {
    fn from(result: VaultResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                error: None,
                data: Some(data),
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
                data: None,
            },
        }
    }
}

/// A single backup with its record and contents
#[derive(Debug, Clone, Serialize)]
pub struct BackupDetails {
    pub record: BackupRecord,
    pub path: PathBuf,
    pub size: u64,
    pub is_compressed: bool,
    pub entries: Vec<String>,
}

/// Orchestrates backup operations for every game under one root
#[derive(Debug, Clone)]
pub struct BackupEngine<R: DirectoryResolver = GameDirectoryResolver> {
    resolver: R,
    retention: RetentionPolicy,
    store: ArchiveStore,
    restorer: RestoreManager,
    format: ContainerFormat,
}

impl BackupEngine<GameDirectoryResolver> {
    /// Create an engine rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>, default_retention: i64) -> VaultResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create backup root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self::with_resolver(
            GameDirectoryResolver::new(root),
            default_retention,
        ))
    }
}

impl<R: DirectoryResolver> BackupEngine<R> {
    pub fn with_resolver(resolver: R, default_retention: i64) -> Self {
        Self {
            resolver,
            retention: RetentionPolicy::new(default_retention),
            store: ArchiveStore::new(),
            restorer: RestoreManager::new(),
            format: ContainerFormat::default(),
        }
    }

    /// Write new backups in `format`
    pub fn with_format(mut self, format: ContainerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Back up a game's save directory
    ///
    /// Skips the write when the source hashes the same as the most recent
    /// backup, unless `force` is set. Retention problems never fail the
    /// backup.
    pub fn backup_game(&self, request: &BackupRequest) -> VaultResult<BackupOutcome> {
        let game_id = request.game_id.trim();
        if game_id.is_empty() {
            return Err(VaultError::Validation("Game id must not be empty".into()));
        }
        let source = expand_path(&request.source_path);
        if !source.exists() {
            return Err(VaultError::Validation(format!(
                "Source path does not exist: {}",
                source.display()
            )));
        }
        if !source.is_dir() {
            return Err(VaultError::Validation(format!(
                "Source path is not a directory: {}",
                source.display()
            )));
        }

        let game_name = non_empty(&request.game_name);
        let dir = self.resolver.resolve(game_id, game_name)?;
        let content_hash = hash_tree(&source)?;

        if !request.force {
            if let Some(newest) = BackupCatalog::new(&self.resolver).newest_container(game_id) {
                match self.store.read_metadata(&newest) {
                    Some(record) if record.content_hash == content_hash => {
                        info!(game_id, %content_hash, "no changes since last backup; skipped");
                        return Ok(BackupOutcome::Skipped {
                            content_hash,
                            latest: newest.path,
                        });
                    }
                    Some(_) => {}
                    None => {
                        debug!(path = %newest.path.display(), "newest backup has no readable metadata");
                    }
                }
            }
        }

        let mut record = BackupRecord::new(
            game_id,
            request.game_name.trim(),
            source.display().to_string(),
            Local::now().naive_local(),
            content_hash,
        )
        .with_display_name(request.display_name.as_deref().unwrap_or(""))
        .with_collection(&request.collection_id);

        let container = self.store.write(&source, &dir, &mut record, self.format)?;
        let compressed_size = container_size(&container);
        info!(
            game_id,
            backup = %record.backup_name,
            size = compressed_size,
            "created backup"
        );

        let evicted = self.retention.enforce(
            &dir,
            &record.collection_id,
            request.retention.enabled,
            request.retention.limit,
        );

        Ok(BackupOutcome::Created(BackupSummary {
            path: container.path,
            backup_name: record.backup_name,
            timestamp: record.backup_time,
            display_name: record.display_name,
            collection_id: record.collection_id,
            content_hash: record.content_hash,
            compressed_size,
            evicted,
        }))
    }

    /// Every backup of a game, newest first
    pub fn list_backups(&self, game_id: &str) -> VaultResult<Vec<CatalogEntry>> {
        BackupCatalog::new(&self.resolver).list(game_id)
    }

    /// Every backup of every game under the root, newest first
    pub fn list_all_backups(&self) -> VaultResult<Vec<CatalogEntry>> {
        BackupCatalog::new(&self.resolver).scan_root()
    }

    /// Read one backup's record and entry list
    pub fn backup_details(&self, backup_path: &Path) -> VaultResult<BackupDetails> {
        let container = self.container_at(backup_path)?;
        let record = self.store.try_read_metadata(&container)?.ok_or_else(|| {
            VaultError::CorruptMetadata(format!("{}: no metadata entry", backup_path.display()))
        })?;
        let entries = self.store.entry_names(&container)?;
        Ok(BackupDetails {
            record,
            size: container_size(&container),
            is_compressed: container.is_archive(),
            entries,
            path: container.path,
        })
    }

    /// Restore a backup into `target` (environment variables expanded)
    pub fn restore_backup(&self, backup_path: &Path, target: &str) -> VaultResult<RestoreReport> {
        let target = expand_path(target);
        self.restorer.restore(backup_path, &target)
    }

    /// Change a backup's display name and optionally its collection
    pub fn rename_backup(
        &self,
        backup_path: &Path,
        display_name: &str,
        collection_id: Option<&str>,
    ) -> VaultResult<BackupRecord> {
        let container = self.container_at(backup_path)?;
        let display_name = display_name.trim().to_string();
        let record = self.store.rewrite_metadata(&container, |record| {
            record.display_name = display_name;
            if let Some(collection_id) = collection_id {
                record.collection_id = normalize_collection_id(collection_id);
            }
        })?;
        debug!(path = %backup_path.display(), label = record.label(), "renamed backup");
        Ok(record)
    }

    /// Delete a backup container
    pub fn delete_backup(&self, backup_path: &Path) -> VaultResult<()> {
        let container = self.container_at(backup_path)?;
        remove_path(&container.path).map_err(|e| {
            VaultError::Io(format!("Failed to delete {}: {}", container.path.display(), e))
        })?;
        info!(path = %container.path.display(), "deleted backup");
        Ok(())
    }

    /// Whether no backup of `game_id` belongs to `collection_id`
    pub fn collection_is_empty(&self, game_id: &str, collection_id: &str) -> VaultResult<bool> {
        Ok(self
            .list_backups(game_id)?
            .iter()
            .all(|entry| entry.record.collection_id != collection_id))
    }

    fn container_at(&self, path: &Path) -> VaultResult<Container> {
        Container::from_path(path)
            .ok_or_else(|| VaultError::backup_not_found(path.display().to_string()))
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn container_size(container: &Container) -> u64 {
    match container.kind {
        ContainerKind::Archive => fs::metadata(&container.path).map(|m| m.len()).unwrap_or(0),
        ContainerKind::Folder => dir_size(&container.path),
    }
}
