//! Content hashing for deduplication
//!
//! The fingerprint covers every regular file's relative path and bytes, in
//! sorted relative-path order, so traversal order never changes the result.
//! Only the first 16 hex characters of the SHA-256 digest are kept; the hash is
//! an equality check between snapshots, not an integrity proof.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{VaultError, VaultResult};
use crate::models::ContentHash;
use crate::storage::{walk_files, TreeFile};

/// Files are fed to the digest in blocks of this size
const READ_BLOCK_SIZE: usize = 64 * 1024;

/// Compute the content hash of the tree rooted at `root`
///
/// Files that cannot be opened are skipped entirely. A read error part-way
/// through a file stops hashing that file but not the tree.
pub fn hash_tree(root: &Path) -> VaultResult<ContentHash> {
    if !root.exists() {
        return Err(VaultError::NotFound {
            entity_type: "Source path",
            identifier: root.display().to_string(),
        });
    }

    let files = walk_files(root);
    let hash = hash_files(&files);
    debug!(root = %root.display(), files = files.len(), %hash, "hashed source tree");
    Ok(hash)
}

fn hash_files(files: &[TreeFile]) -> ContentHash {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BLOCK_SIZE];

    for file in files {
        let mut handle = match File::open(&file.path) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        hasher.update(file.relative.as_bytes());
        loop {
            match handle.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buffer[..n]),
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "read failed mid-file");
                    break;
                }
            }
        }
    }

    ContentHash::from_digest(&format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_tree(root: &Path) {
        fs::create_dir_all(root.join("profile")).unwrap();
        fs::write(root.join("ER0000.sl2"), vec![7u8; 200_000]).unwrap();
        fs::write(root.join("profile/settings.ini"), b"fov=90").unwrap();
    }

    #[test]
    fn test_hash_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());

        let first = hash_tree(temp_dir.path()).unwrap();
        let second = hash_tree(temp_dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 16);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identical_trees_hash_equal() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_tree(a.path());
        // Create in a different order
        fs::write(b.path().join("ER0000.sl2"), vec![7u8; 200_000]).unwrap();
        fs::create_dir_all(b.path().join("profile")).unwrap();
        fs::write(b.path().join("profile/settings.ini"), b"fov=90").unwrap();

        assert_eq!(hash_tree(a.path()).unwrap(), hash_tree(b.path()).unwrap());
    }

    #[test]
    fn test_content_change_changes_hash() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());
        let before = hash_tree(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("profile/settings.ini"), b"fov=91").unwrap();
        assert_ne!(before, hash_tree(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_rename_changes_hash() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());
        let before = hash_tree(temp_dir.path()).unwrap();

        fs::rename(
            temp_dir.path().join("profile/settings.ini"),
            temp_dir.path().join("profile/settings.bak"),
        )
        .unwrap();
        assert_ne!(before, hash_tree(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_add_and_remove_change_hash() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());
        let before = hash_tree(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("extra.sav"), b"").unwrap();
        let added = hash_tree(temp_dir.path()).unwrap();
        assert_ne!(before, added);

        fs::remove_file(temp_dir.path().join("extra.sav")).unwrap();
        assert_eq!(before, hash_tree(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_empty_directories_do_not_contribute() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());
        let before = hash_tree(temp_dir.path()).unwrap();

        fs::create_dir(temp_dir.path().join("empty")).unwrap();
        assert_eq!(before, hash_tree(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_file_that_cannot_be_opened_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());
        let mut files = walk_files(temp_dir.path());
        let expected = hash_files(&files);

        files.insert(
            1,
            TreeFile {
                path: temp_dir.path().join("vanished.sav"),
                relative: "vanished.sav".to_string(),
            },
        );
        assert_eq!(hash_files(&files), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());
        let expected = hash_tree(temp_dir.path()).unwrap();

        let locked = temp_dir.path().join("locked.sav");
        fs::write(&locked, b"secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if File::open(&locked).is_ok() {
            // Permission bits do not apply (running as root)
            return;
        }

        assert_eq!(hash_tree(temp_dir.path()).unwrap(), expected);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_contributes_content() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("saves");
        write_tree(&root);
        let real = temp_dir.path().join("compatdata.sav");
        fs::write(&real, b"slot 1").unwrap();
        std::os::unix::fs::symlink(&real, root.join("slot.sav")).unwrap();
        let before = hash_tree(&root).unwrap();

        fs::write(&real, b"slot 2").unwrap();
        assert_ne!(before, hash_tree(&root).unwrap());
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let err = hash_tree(&temp_dir.path().join("missing")).unwrap_err();
        assert!(err.is_not_found());
    }
}
