//! Core data models for SaveVault
//!
//! This module contains the typed records the backup engine works with:
//! backup metadata, containers on disk, and collections.

pub mod collection;
pub mod container;
pub mod record;

pub use collection::{Collection, DEFAULT_COLLECTION_ID, DEFAULT_COLLECTION_NAME};
pub use container::{Container, ContainerKind, ARCHIVE_EXTENSION, METADATA_FILE};
pub use record::{BackupRecord, CatalogEntry, Compression, ContentHash};
