//! Backup engine for SaveVault
//!
//! Snapshots a game's save directory into versioned containers, skips
//! snapshots that did not change, keeps a rolling number of backups per
//! collection, and restores with a safety copy of whatever it overwrites.
//!
//! # Architecture
//!
//! - `hasher`: content fingerprint of a directory tree, used for deduplication
//! - `resolver`: maps a game to its backup directory and migrates the legacy layout
//! - `archive`: writes, reads and rewrites single containers
//! - `retention`: evicts the oldest containers of a collection
//! - `catalog`: lists a game's backups across every directory
//! - `restore`: extracts a container back into a target directory
//! - `engine`: the `BackupEngine` orchestrating all of the above
//!
//! # Layout
//!
//! ```text
//! {root}/
//!   Elden_Ring__eldenring/
//!     eldenring_20240101_120000.zip      <- files + _backup_info.json
//!     eldenring_20240102_090000.zip
//!   celeste/                             <- legacy layout, migrated on next backup
//!     celeste_20230101_080000/           <- folder backup
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use savevault::backup::{BackupEngine, BackupRequest, RetentionSetting};
//!
//! let engine = BackupEngine::new("/backups", 10)?;
//! let request = BackupRequest::new("eldenring", "Elden Ring", "$APPDATA/EldenRing")
//!     .retention(RetentionSetting::keep(5));
//! let outcome = engine.backup_game(&request)?;
//! ```

pub mod archive;
pub mod catalog;
pub mod engine;
pub mod hasher;
pub mod resolver;
pub mod restore;
pub mod retention;

pub use archive::{ArchiveStore, ContainerFormat};
pub use catalog::BackupCatalog;
pub use engine::{
    BackupDetails, BackupEngine, BackupOutcome, BackupRequest, BackupSummary, OperationReport,
    RetentionSetting,
};
pub use hasher::hash_tree;
pub use resolver::{sanitize_folder_name, DirectoryResolver, GameDirectoryResolver};
pub use restore::{RestoreManager, RestoreReport};
pub use retention::{RetentionPolicy, DEFAULT_MAX_BACKUPS};
