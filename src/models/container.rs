//! Backup container model
//!
//! A container is either a zip archive or a plain folder. Both hold the
//! backed-up files plus exactly one metadata entry.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Reserved name of the metadata entry inside every container
pub const METADATA_FILE: &str = "_backup_info.json";

/// File extension of archive containers
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Physical form of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Compressed zip archive
    Archive,
    /// Uncompressed folder
    Folder,
}

/// A backup container on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub path: PathBuf,
    pub kind: ContainerKind,
}

impl Container {
    /// Classify a directory entry as a container
    ///
    /// Regular files ending in `.zip` are archives; directories not starting
    /// with `.` are folders. Anything else returns `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        if name.starts_with('.') {
            return None;
        }

        let metadata = fs::metadata(path).ok()?;
        if metadata.is_dir() {
            return Some(Self {
                path: path.to_path_buf(),
                kind: ContainerKind::Folder,
            });
        }

        let is_archive = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
        if metadata.is_file() && is_archive {
            Some(Self {
                path: path.to_path_buf(),
                kind: ContainerKind::Archive,
            })
        } else {
            None
        }
    }

    /// List every container directly inside a backup directory
    ///
    /// A missing or unreadable directory yields an empty list.
    pub fn scan_dir(dir: &Path) -> Vec<Self> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut containers: Vec<Self> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Self::from_path(&entry.path()))
            .collect();
        containers.sort_by(|a, b| a.path.cmp(&b.path));
        containers
    }

    pub fn is_archive(&self) -> bool {
        self.kind == ContainerKind::Archive
    }

    /// File name without the `.zip` extension
    pub fn stem(&self) -> String {
        let stem = match self.kind {
            ContainerKind::Archive => self.path.file_stem(),
            ContainerKind::Folder => self.path.file_name(),
        };
        stem.map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Last modification time, or the epoch if it cannot be read
    pub fn modified(&self) -> SystemTime {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }
}
