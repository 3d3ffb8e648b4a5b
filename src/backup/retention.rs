//! Rolling retention
//!
//! Keeps at most N containers per collection inside a backup directory,
//! evicting the oldest (by modification time) first.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backup::archive::ArchiveStore;
use crate::error::{VaultError, VaultResult};
use crate::models::{Container, DEFAULT_COLLECTION_ID};
use crate::storage::remove_path;

/// Retention count used when a collection enables retention without a limit
pub const DEFAULT_MAX_BACKUPS: i64 = 10;

/// Evicts the oldest containers of a collection
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    default_limit: i64,
    store: ArchiveStore,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BACKUPS)
    }
}

impl RetentionPolicy {
    pub fn new(default_limit: i64) -> Self {
        Self {
            default_limit,
            store: ArchiveStore::new(),
        }
    }

    /// Resolve a requested limit to a usable count
    pub fn resolve_limit(&self, requested: Option<i64>) -> VaultResult<usize> {
        let limit = requested.unwrap_or(self.default_limit);
        if limit <= 0 {
            return Err(VaultError::RetentionLimitInvalid(limit));
        }
        Ok(limit as usize)
    }

    /// Delete the oldest containers of `collection_id` in `dir` beyond the limit
    ///
    /// Returns the paths that were actually removed. Does nothing unless
    /// `enabled`, or when the limit is not positive. A container that cannot be
    /// deleted is skipped and does not stop the sweep.
    pub fn enforce(
        &self,
        dir: &Path,
        collection_id: &str,
        enabled: bool,
        limit: Option<i64>,
    ) -> Vec<PathBuf> {
        if !enabled {
            return Vec::new();
        }

        let limit = match self.resolve_limit(limit) {
            Ok(limit) => limit,
            Err(e) => {
                debug!(error = %e, "retention skipped");
                return Vec::new();
            }
        };

        let mut members: Vec<_> = Container::scan_dir(dir)
            .into_iter()
            .filter(|container| self.collection_of(container) == collection_id)
            .map(|container| (container.modified(), container))
            .collect();

        if members.len() <= limit {
            return Vec::new();
        }

        members.sort_by(|(a_time, a), (b_time, b)| a_time.cmp(b_time).then(a.path.cmp(&b.path)));

        let excess = members.len() - limit;
        evict(members.into_iter().take(excess).map(|(_, c)| c), collection_id)
    }

    fn collection_of(&self, container: &Container) -> String {
        self.store
            .read_metadata(container)
            .map(|record| record.collection_id)
            .unwrap_or_else(|| DEFAULT_COLLECTION_ID.to_string())
    }
}

/// Delete each container in turn; failures are logged and skipped
fn evict(containers: impl IntoIterator<Item = Container>, collection_id: &str) -> Vec<PathBuf> {
    let mut evicted = Vec::new();
    for container in containers {
        match remove_path(&container.path) {
            Ok(()) => {
                info!(path = %container.path.display(), collection = collection_id, "evicted old backup");
                evicted.push(container.path);
            }
            Err(e) => {
                warn!(path = %container.path.display(), error = %e, "could not evict backup");
            }
        }
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive::ContainerFormat;
    use crate::models::{BackupRecord, ContainerKind, ContentHash};
    use chrono::NaiveDate;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    /// Write a container in `collection` and pin its mtime to `age_secs` ago
    fn make_backup(dir: &Path, source: &Path, hour: u32, collection: &str, age_secs: u64) -> PathBuf {
        let time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        let mut record = BackupRecord::new("hades", "Hades", "", time, ContentHash::new("00"))
            .with_collection(collection);
        let container = ArchiveStore::new()
            .write(source, dir, &mut record, ContainerFormat::Archive)
            .unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&container.path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        container.path
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let dir = temp_dir.path().join("backups");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&dir).unwrap();
        fs::write(source.join("save.dat"), b"data").unwrap();
        (temp_dir, source, dir)
    }

    #[test]
    fn test_resolve_limit() {
        let policy = RetentionPolicy::new(5);
        assert_eq!(policy.resolve_limit(None).unwrap(), 5);
        assert_eq!(policy.resolve_limit(Some(2)).unwrap(), 2);
        assert!(matches!(
            policy.resolve_limit(Some(0)),
            Err(VaultError::RetentionLimitInvalid(0))
        ));
        assert!(RetentionPolicy::new(-1).resolve_limit(None).is_err());
    }

    #[test]
    fn test_evicts_oldest_first() {
        let (_temp, source, dir) = setup();
        let oldest = make_backup(&dir, &source, 1, "default", 300);
        let middle = make_backup(&dir, &source, 2, "default", 200);
        let newest = make_backup(&dir, &source, 3, "default", 100);

        let evicted = RetentionPolicy::default().enforce(&dir, "default", true, Some(2));
        assert_eq!(evicted, vec![oldest.clone()]);
        assert!(!oldest.exists());
        assert!(middle.exists());
        assert!(newest.exists());
    }

    #[test]
    fn test_disabled_is_noop() {
        let (_temp, source, dir) = setup();
        make_backup(&dir, &source, 1, "default", 300);
        make_backup(&dir, &source, 2, "default", 200);

        let evicted = RetentionPolicy::default().enforce(&dir, "default", false, Some(1));
        assert!(evicted.is_empty());
        assert_eq!(Container::scan_dir(&dir).len(), 2);
    }

    #[test]
    fn test_non_positive_limit_is_noop() {
        let (_temp, source, dir) = setup();
        make_backup(&dir, &source, 1, "default", 300);
        make_backup(&dir, &source, 2, "default", 200);

        let policy = RetentionPolicy::default();
        assert!(policy.enforce(&dir, "default", true, Some(0)).is_empty());
        assert!(policy.enforce(&dir, "default", true, Some(-4)).is_empty());
        assert_eq!(Container::scan_dir(&dir).len(), 2);
    }

    #[test]
    fn test_scoped_to_collection() {
        let (_temp, source, dir) = setup();
        let other_old = make_backup(&dir, &source, 1, "a1b2c3d4", 500);
        let main_old = make_backup(&dir, &source, 2, "default", 400);
        let main_new = make_backup(&dir, &source, 3, "default", 300);

        let evicted = RetentionPolicy::default().enforce(&dir, "default", true, Some(1));
        assert_eq!(evicted, vec![main_old]);
        assert!(other_old.exists());
        assert!(main_new.exists());
    }

    #[test]
    fn test_missing_metadata_counts_as_default() {
        let (_temp, source, dir) = setup();
        let bare = dir.join("hades_20230101_000000");
        fs::create_dir(&bare).unwrap();
        fs::write(bare.join("save.dat"), b"old").unwrap();
        File::open(&bare)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(1000))
            .unwrap();
        let kept = make_backup(&dir, &source, 1, "default", 10);

        let evicted = RetentionPolicy::default().enforce(&dir, "default", true, Some(1));
        assert_eq!(evicted, vec![bare.clone()]);
        assert!(!bare.exists());
        assert!(kept.exists());
    }

    #[test]
    fn test_eviction_continues_past_failures() {
        let (_temp, source, dir) = setup();
        let doomed = make_backup(&dir, &source, 1, "default", 300);
        let gone = Container {
            path: dir.join("hades_20230101_000000.zip"),
            kind: ContainerKind::Archive,
        };
        let doomed_container = Container::from_path(&doomed).unwrap();

        let evicted = evict(vec![gone, doomed_container], "default");
        assert_eq!(evicted, vec![doomed.clone()]);
        assert!(!doomed.exists());
    }

    #[test]
    fn test_default_limit_when_unset() {
        let (_temp, source, dir) = setup();
        for hour in 0..4 {
            make_backup(&dir, &source, hour, "default", 1000 - hour as u64 * 10);
        }

        let evicted = RetentionPolicy::new(3).enforce(&dir, "default", true, None);
        assert_eq!(evicted.len(), 1);
        assert_eq!(Container::scan_dir(&dir).len(), 3);
    }
}
