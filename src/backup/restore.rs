//! Backup restoration
//!
//! Puts a backup's files back into a target directory. Whatever the target
//! held before is first copied aside to `{name}_pre_restore_{timestamp}` next
//! to it, so a restore can always be undone by hand.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{VaultError, VaultResult};
use crate::models::record::BACKUP_NAME_TIME_FORMAT;
use crate::models::{Container, ContainerKind, METADATA_FILE};
use crate::storage::{copy_tree, has_content, remove_path, unique_path};

/// Marker between the target name and the timestamp of a safety copy
const SAFETY_COPY_MARKER: &str = "_pre_restore_";

/// Restores containers into target directories
#[derive(Debug, Clone, Default)]
pub struct RestoreManager;

impl RestoreManager {
    pub fn new() -> Self {
        Self
    }

    /// Restore the container at `backup_path` into `target`
    ///
    /// If the safety copy cannot be made the target is left untouched. Errors
    /// after the target has been cleared are returned as-is; the safety copy is
    /// kept so the previous state can be recovered.
    pub fn restore(&self, backup_path: &Path, target: &Path) -> VaultResult<RestoreReport> {
        let container = Container::from_path(backup_path)
            .ok_or_else(|| VaultError::backup_not_found(backup_path.display().to_string()))?;

        let safety_copy = if has_content(target) {
            let copy = self.make_safety_copy(target)?;
            remove_path(target).map_err(|e| {
                VaultError::Io(format!("Failed to clear {}: {}", target.display(), e))
            })?;
            Some(copy)
        } else {
            None
        };

        fs::create_dir_all(target)?;

        let files_restored = match container.kind {
            ContainerKind::Archive => extract_archive(&container.path, target)?,
            ContainerKind::Folder => copy_tree(&container.path, target, Some(METADATA_FILE))?,
        };

        info!(
            backup = %container.path.display(),
            target = %target.display(),
            files = files_restored,
            "restored backup"
        );

        Ok(RestoreReport {
            restored_to: target.to_path_buf(),
            safety_copy,
            files_restored,
        })
    }

    /// Copy `target` to a sibling `{name}_pre_restore_{YYYYMMDD_HHMMSS}`
    fn make_safety_copy(&self, target: &Path) -> VaultResult<PathBuf> {
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "restore".to_string());
        let base = format!(
            "{}{}{}",
            name,
            SAFETY_COPY_MARKER,
            Local::now().format(BACKUP_NAME_TIME_FORMAT)
        );
        let (copy_path, _) = unique_path(parent, &base, "");

        let result = if target.is_dir() {
            copy_tree(target, &copy_path, None).map(|_| ())
        } else {
            fs::copy(target, &copy_path).map(|_| ()).map_err(VaultError::from)
        };

        if let Err(e) = result {
            if copy_path.exists() {
                if let Err(cleanup) = remove_path(&copy_path) {
                    warn!(path = %copy_path.display(), error = %cleanup, "could not remove partial safety copy");
                }
            }
            return Err(VaultError::Io(format!(
                "Safety copy of {} failed, restore aborted: {}",
                target.display(),
                e
            )));
        }

        debug!(path = %copy_path.display(), "created safety copy");
        Ok(copy_path)
    }
}

/// Extract every entry except the metadata into `target`
fn extract_archive(archive_path: &Path, target: &Path) -> VaultResult<usize> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.name() == METADATA_FILE {
            continue;
        }

        let relative = match entry.enclosed_name() {
            Some(path) => path,
            None => {
                warn!(entry = entry.name(), "skipping archive entry outside the target");
                continue;
            }
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&out_path)?;
        io::copy(&mut entry, &mut output)?;
        extracted += 1;
    }

    Ok(extracted)
}

/// Result of a restore operation
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    /// Directory the files were restored into
    pub restored_to: PathBuf,
    /// Copy of the previous target contents, if there were any
    pub safety_copy: Option<PathBuf>,
    /// Number of files written
    pub files_restored: usize,
}

impl RestoreReport {
    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Restored {} file(s) to {}",
            self.files_restored,
            self.restored_to.display()
        );
        if let Some(copy) = &self.safety_copy {
            summary.push_str(&format!(" (previous contents saved to {})", copy.display()));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive::{ArchiveStore, ContainerFormat};
    use crate::models::{BackupRecord, ContentHash};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_env(format: ContainerFormat) -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("saves");
        let backups = temp_dir.path().join("backups");
        fs::create_dir_all(source.join("slot1")).unwrap();
        fs::create_dir_all(&backups).unwrap();
        fs::write(source.join("ER0000.sl2"), b"original").unwrap();
        fs::write(source.join("slot1/data.bin"), b"slot data").unwrap();

        let time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut record = BackupRecord::new("eldenring", "Elden Ring", "", time, ContentHash::new("00"));
        let container = ArchiveStore::new()
            .write(&source, &backups, &mut record, format)
            .unwrap();

        (temp_dir, source, container.path)
    }

    #[test]
    fn test_restore_archive_with_safety_copy() {
        let (temp, source, backup) = create_test_env(ContainerFormat::Archive);
        fs::write(source.join("ER0000.sl2"), b"corrupted").unwrap();
        fs::write(source.join("new.tmp"), b"junk").unwrap();

        let report = RestoreManager::new().restore(&backup, &source).unwrap();

        assert_eq!(report.files_restored, 2);
        assert_eq!(fs::read(source.join("ER0000.sl2")).unwrap(), b"original");
        assert_eq!(fs::read(source.join("slot1/data.bin")).unwrap(), b"slot data");
        assert!(!source.join("new.tmp").exists());
        assert!(!source.join(METADATA_FILE).exists());

        let copy = report.safety_copy.unwrap();
        assert_eq!(copy.parent().unwrap(), temp.path());
        assert!(copy
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("saves_pre_restore_"));
        assert_eq!(fs::read(copy.join("ER0000.sl2")).unwrap(), b"corrupted");
        assert!(copy.join("new.tmp").exists());
    }

    #[test]
    fn test_restore_folder_backup() {
        let (_temp, source, backup) = create_test_env(ContainerFormat::Folder);
        fs::remove_dir_all(&source).unwrap();

        let report = RestoreManager::new().restore(&backup, &source).unwrap();

        assert!(report.safety_copy.is_none());
        assert_eq!(report.files_restored, 2);
        assert_eq!(fs::read(source.join("ER0000.sl2")).unwrap(), b"original");
        assert!(!source.join(METADATA_FILE).exists());
    }

    #[test]
    fn test_restore_into_empty_dir_needs_no_safety_copy() {
        let (temp, _source, backup) = create_test_env(ContainerFormat::Archive);
        let target = temp.path().join("fresh");
        fs::create_dir(&target).unwrap();

        let report = RestoreManager::new().restore(&backup, &target).unwrap();
        assert!(report.safety_copy.is_none());
        assert!(target.join("slot1/data.bin").exists());
    }

    #[test]
    fn test_restore_missing_backup() {
        let (temp, source, _backup) = create_test_env(ContainerFormat::Archive);
        let result = RestoreManager::new().restore(&temp.path().join("nope.zip"), &source);

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(fs::read(source.join("ER0000.sl2")).unwrap(), b"original");
    }

    #[cfg(unix)]
    #[test]
    fn test_safety_copy_keeps_symlinked_saves() {
        let (temp, source, backup) = create_test_env(ContainerFormat::Archive);
        let outside = temp.path().join("outside.sav");
        fs::write(&outside, b"proton prefix save").unwrap();
        std::os::unix::fs::symlink(&outside, source.join("linked.sav")).unwrap();

        let report = RestoreManager::new().restore(&backup, &source).unwrap();

        let copy = report.safety_copy.unwrap();
        assert_eq!(fs::read(copy.join("linked.sav")).unwrap(), b"proton prefix save");
        assert_eq!(fs::read(copy.join("ER0000.sl2")).unwrap(), b"original");
        assert!(!source.join("linked.sav").exists());
        assert_eq!(fs::read(&outside).unwrap(), b"proton prefix save");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_safety_copy_leaves_target_untouched() {
        let (temp, source, backup) = create_test_env(ContainerFormat::Archive);
        fs::write(source.join("ER0000.sl2"), b"current").unwrap();
        // A link cycle cannot be duplicated
        std::os::unix::fs::symlink(&source, source.join("slot1/loop")).unwrap();

        let result = RestoreManager::new().restore(&backup, &source);

        assert!(result.is_err());
        assert_eq!(fs::read(source.join("ER0000.sl2")).unwrap(), b"current");
        assert!(fs::symlink_metadata(source.join("slot1/loop")).is_ok());
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.contains(SAFETY_COPY_MARKER))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_restore_report_summary() {
        let report = RestoreReport {
            restored_to: PathBuf::from("/saves"),
            safety_copy: Some(PathBuf::from("/saves_pre_restore_20240101_120000")),
            files_restored: 3,
        };
        assert!(report.summary().contains("Restored 3 file(s)"));
        assert!(report.summary().contains("pre_restore"));
    }
}
