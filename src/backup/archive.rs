//! Archive store
//!
//! Creates, reads and rewrites backup containers. A container is a zip archive
//! (or a plain folder) holding the backed-up files under their paths relative
//! to the source root, plus one `_backup_info.json` metadata entry.
//!
//! Writes never leave a partial container behind, and metadata rewrites of
//! archives go through a temporary file that atomically replaces the original.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{VaultError, VaultResult};
use crate::models::{
    BackupRecord, Compression, Container, ContainerKind, ARCHIVE_EXTENSION, METADATA_FILE,
};
use crate::storage::{copy_tree, unique_path, walk_files, TreeFile};

/// Deflate level used for every entry
const COMPRESSION_LEVEL: i64 = 9;

/// Physical form new backups are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerFormat {
    /// Deflate-compressed zip archive
    #[default]
    Archive,
    /// Uncompressed folder copy
    Folder,
}

impl ContainerFormat {
    fn compression(self) -> Compression {
        match self {
            Self::Archive => Compression::Zip,
            Self::Folder => Compression::None,
        }
    }

    fn extension(self) -> String {
        match self {
            Self::Archive => format!(".{}", ARCHIVE_EXTENSION),
            Self::Folder => String::new(),
        }
    }
}

/// Reads and writes backup containers
#[derive(Debug, Clone, Default)]
pub struct ArchiveStore;

impl ArchiveStore {
    pub fn new() -> Self {
        Self
    }

    /// Write a new container for `record` inside `dir`
    ///
    /// The container is named after `record.backup_name`; when that name is
    /// already taken a `-N` suffix is added and the record updated to match.
    /// On failure the partially written container is removed.
    pub fn write(
        &self,
        source: &Path,
        dir: &Path,
        record: &mut BackupRecord,
        format: ContainerFormat,
    ) -> VaultResult<Container> {
        let (path, name) = unique_path(dir, &record.backup_name, &format.extension());
        record.backup_name = name;
        record.compression = format.compression();

        match format {
            ContainerFormat::Archive => write_archive(source, &path, record)?,
            ContainerFormat::Folder => write_folder(source, &path, record)?,
        }

        debug!(path = %path.display(), "wrote backup container");
        Ok(Container {
            path,
            kind: match format {
                ContainerFormat::Archive => ContainerKind::Archive,
                ContainerFormat::Folder => ContainerKind::Folder,
            },
        })
    }

    /// Read a container's metadata, treating absence and corruption alike
    pub fn read_metadata(&self, container: &Container) -> Option<BackupRecord> {
        match self.try_read_metadata(container) {
            Ok(record) => record,
            Err(e) => {
                debug!(path = %container.path.display(), error = %e, "ignoring unreadable metadata");
                None
            }
        }
    }

    /// Read a container's metadata
    ///
    /// Returns `Ok(None)` when the container has no metadata entry and
    /// `Err(CorruptMetadata)` when the entry or the archive cannot be parsed.
    pub fn try_read_metadata(&self, container: &Container) -> VaultResult<Option<BackupRecord>> {
        let corrupt = |detail: String| {
            VaultError::CorruptMetadata(format!("{}: {}", container.path.display(), detail))
        };

        let content = match container.kind {
            ContainerKind::Archive => {
                let file = File::open(&container.path)?;
                let mut archive = ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;
                let mut entry = match archive.by_name(METADATA_FILE) {
                    Ok(entry) => entry,
                    Err(ZipError::FileNotFound) => return Ok(None),
                    Err(e) => return Err(corrupt(e.to_string())),
                };
                let mut content = String::new();
                entry
                    .read_to_string(&mut content)
                    .map_err(|e| corrupt(e.to_string()))?;
                content
            }
            ContainerKind::Folder => {
                let metadata_path = container.path.join(METADATA_FILE);
                if !metadata_path.is_file() {
                    return Ok(None);
                }
                fs::read_to_string(&metadata_path).map_err(|e| corrupt(e.to_string()))?
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| corrupt(e.to_string()))
    }

    /// Rewrite a container's metadata with `mutator`
    ///
    /// Archives are copied entry by entry into `{name}.tmp` with the updated
    /// metadata, then renamed over the original. If anything fails the
    /// temporary file is deleted and the original is left untouched. The
    /// original modification time is kept so the backup's place in retention
    /// order does not change.
    ///
    /// Folder metadata is rewritten in place.
    pub fn rewrite_metadata<F>(&self, container: &Container, mutator: F) -> VaultResult<BackupRecord>
    where
        F: FnOnce(&mut BackupRecord),
    {
        let mut record = self
            .read_metadata(container)
            .unwrap_or_else(|| BackupRecord::placeholder(&container.stem()));
        mutator(&mut record);

        match container.kind {
            ContainerKind::Archive => {
                let original_mtime = fs::metadata(&container.path).and_then(|m| m.modified());
                let temp_path = temp_path_for(&container.path);

                let result = copy_with_metadata(&container.path, &temp_path, &record)
                    .and_then(|()| fs::rename(&temp_path, &container.path).map_err(VaultError::from));
                if let Err(e) = result {
                    if let Err(cleanup) = fs::remove_file(&temp_path) {
                        debug!(path = %temp_path.display(), error = %cleanup, "no temp file to clean up");
                    }
                    return Err(e);
                }

                if let Ok(mtime) = original_mtime {
                    let restored = OpenOptions::new()
                        .write(true)
                        .open(&container.path)
                        .and_then(|file| file.set_modified(mtime));
                    if let Err(e) = restored {
                        warn!(path = %container.path.display(), error = %e, "could not keep modification time");
                    }
                }
            }
            ContainerKind::Folder => {
                let json = serde_json::to_string_pretty(&record)?;
                fs::write(container.path.join(METADATA_FILE), json)?;
            }
        }

        Ok(record)
    }

    /// Names of the user-data entries in a container (metadata excluded)
    pub fn entry_names(&self, container: &Container) -> VaultResult<Vec<String>> {
        let mut names = match container.kind {
            ContainerKind::Archive => {
                let archive = ZipArchive::new(File::open(&container.path)?)?;
                archive
                    .file_names()
                    .filter(|name| *name != METADATA_FILE && !name.ends_with('/'))
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            }
            ContainerKind::Folder => walk_files(&container.path)
                .into_iter()
                .map(|file| file.relative)
                .filter(|name| name != METADATA_FILE)
                .collect(),
        };
        names.sort();
        Ok(names)
    }
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Zip timestamp for a file's modification time, in local time
///
/// Times outside the zip range (1980-2107) fall back to the writer's default.
fn zip_time(modified: SystemTime) -> Option<zip::DateTime> {
    let local = DateTime::<Local>::from(modified);
    zip::DateTime::from_date_and_time(
        u16::try_from(local.year()).ok()?,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

fn write_archive(source: &Path, dest: &Path, record: &BackupRecord) -> VaultResult<()> {
    write_entries(&walk_files(source), dest, record)
}

/// Create `dest` and fill it with `files`; remove it again if filling fails
fn write_entries(files: &[TreeFile], dest: &Path, record: &BackupRecord) -> VaultResult<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| VaultError::Io(format!("Failed to create {}: {}", dest.display(), e)))?;

    let result = fill_archive(file, files, record);
    if result.is_err() {
        if let Err(e) = fs::remove_file(dest) {
            warn!(path = %dest.display(), error = %e, "could not remove partial archive");
        }
    }
    result
}

fn fill_archive(file: File, files: &[TreeFile], record: &BackupRecord) -> VaultResult<()> {
    let mut zip = ZipWriter::new(file);

    for entry in files {
        if entry.relative == METADATA_FILE {
            warn!(path = %entry.path.display(), "source file uses the reserved metadata name; skipped");
            continue;
        }
        let mut input = File::open(&entry.path).map_err(|e| {
            VaultError::Io(format!("Failed to read {}: {}", entry.path.display(), e))
        })?;
        let mut options = file_options();
        if let Some(time) = input.metadata().and_then(|m| m.modified()).ok().and_then(zip_time) {
            options = options.last_modified_time(time);
        }
        zip.start_file(entry.relative.as_str(), options)?;
        io::copy(&mut input, &mut zip)?;
    }

    zip.start_file(METADATA_FILE, file_options())?;
    serde_json::to_writer_pretty(&mut zip, record)?;

    let mut file = zip.finish()?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

fn write_folder(source: &Path, dest: &Path, record: &BackupRecord) -> VaultResult<()> {
    fs::create_dir(dest)
        .map_err(|e| VaultError::Io(format!("Failed to create {}: {}", dest.display(), e)))?;

    let result = copy_tree(source, dest, Some(METADATA_FILE)).and_then(|_| {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(dest.join(METADATA_FILE), json)?;
        Ok(())
    });

    if result.is_err() {
        if let Err(e) = fs::remove_dir_all(dest) {
            warn!(path = %dest.display(), error = %e, "could not remove partial folder backup");
        }
    }
    result
}

/// Copy every entry of `src` except the metadata into a new archive at `dest`,
/// then append `record` as the metadata entry
///
/// Entries are copied raw, so their compressed bytes and timestamps are kept.
fn copy_with_metadata(src: &Path, dest: &Path, record: &BackupRecord) -> VaultResult<()> {
    let mut source = ZipArchive::new(File::open(src)?)?;
    let mut zip = ZipWriter::new(File::create(dest)?);

    for i in 0..source.len() {
        let entry = source.by_index_raw(i)?;
        if entry.name() == METADATA_FILE {
            continue;
        }
        zip.raw_copy_file(entry)?;
    }

    zip.start_file(METADATA_FILE, file_options())?;
    serde_json::to_writer_pretty(&mut zip, record)?;

    let file = zip.finish()?;
    file.sync_all()?;
    Ok(())
}
