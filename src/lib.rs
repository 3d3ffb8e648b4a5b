//! SaveVault - versioned, deduplicated backups of game save directories
//!
//! This library provides the backup engine behind the `savevault` command:
//! content hashing for deduplication, zip containers with embedded metadata,
//! per-game directory resolution with legacy-layout migration, rolling
//! retention per collection, and restore with a safety copy.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `backup`: The backup engine and its components
//! - `config`: Paths, user settings and environment variable expansion
//! - `error`: Custom error types
//! - `models`: Backup records, containers and collections
//! - `storage`: Atomic JSON files and directory tree helpers
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the binary
//! - `logging`: tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use savevault::backup::{BackupEngine, BackupRequest};
//! use savevault::config::{Settings, VaultPaths};
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let engine = BackupEngine::new(settings.backup_root(&paths), settings.max_backups)?;
//! let outcome = engine.backup_game(&BackupRequest::new("celeste", "Celeste", "/saves/celeste"))?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;

pub use error::{VaultError, VaultResult};
