//! Directory tree helpers
//!
//! Recursive walking, copying, sizing and removal shared by the hasher, the
//! archive store and the restore path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{VaultError, VaultResult};

/// A regular file found under a tree root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated
    pub relative: String,
}

/// Collect every regular file under `root`, sorted by relative path
///
/// Symlinks to files are included and read through; symlinked directories
/// are not descended into. Entries that cannot be read while walking, and
/// names that are not valid UTF-8, are skipped.
pub fn walk_files(root: &Path) -> Vec<TreeFile> {
    let mut files: Vec<TreeFile> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
        })
        .filter_map(|entry| {
            let relative = relative_name(root, entry.path())?;
            Some(TreeFile {
                path: entry.into_path(),
                relative,
            })
        })
        .collect();

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}

/// Relative path of `path` under `root` with `/` separators
///
/// `None` for the root itself and for paths with a non-UTF-8 component.
pub fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component.as_os_str().to_str() {
            Some(part) => parts.push(part),
            None => {
                warn!(path = %path.display(), "skipping file with a non UTF-8 name");
                return None;
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Total size in bytes of every regular file under `path`
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.metadata().map(|m| m.len()).unwrap_or(0))
        .sum()
}

/// Recursively copy `src` into `dst`, returning the number of files copied
///
/// Symlinks are copied by content. A top-level entry named `skip` is left out
/// of the copy. Dangling symlinks are skipped with a warning; any other entry
/// that cannot be duplicated (link loops, sockets, fifos, devices) is an error.
pub fn copy_tree(src: &Path, dst: &Path, skip: Option<&str>) -> VaultResult<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_dangling_link(&e) => {
                warn!(error = %e, "skipping dangling symlink");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| VaultError::Io(e.to_string()))?;

        if let Some(skip) = skip {
            if entry.depth() == 1 && relative.as_os_str() == skip {
                continue;
            }
        }

        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target).map_err(|e| {
                VaultError::Io(format!("Failed to copy {}: {}", entry.path().display(), e))
            })?;
            copied += 1;
        } else {
            return Err(VaultError::Io(format!(
                "Cannot copy special file {}",
                entry.path().display()
            )));
        }
    }

    Ok(copied)
}

/// Whether a walk error comes from a symlink whose target is gone
fn is_dangling_link(error: &walkdir::Error) -> bool {
    if error.loop_ancestor().is_some() {
        return false;
    }
    error.path().map_or(false, |path| {
        fs::symlink_metadata(path).map_or(false, |m| m.file_type().is_symlink())
            && fs::metadata(path).is_err()
    })
}

/// Remove a file or a whole directory tree
pub fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Whether `path` exists and is a non-empty directory or a file
pub fn has_content(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(true),
        Ok(_) => true,
        Err(_) => false,
    }
}

/// First free path `{dir}/{base}{ext}`, then `{base}-2{ext}`, `{base}-3{ext}`, ...
///
/// `ext` includes its leading dot, or is empty for directories.
pub fn unique_path(dir: &Path, base: &str, ext: &str) -> (PathBuf, String) {
    let mut name = base.to_string();
    let mut counter = 2;
    loop {
        let candidate = dir.join(format!("{}{}", name, ext));
        if fs::symlink_metadata(&candidate).is_err() {
            return (candidate, name);
        }
        name = format!("{}-{}", base, counter);
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("slot1/sub")).unwrap();
        fs::write(root.join("b.sav"), b"bbb").unwrap();
        fs::write(root.join("a.sav"), b"a").unwrap();
        fs::write(root.join("slot1/sub/deep.sav"), b"deep!").unwrap();
    }

    #[test]
    fn test_walk_files_sorted() {
        let temp_dir = TempDir::new().unwrap();
        sample_tree(temp_dir.path());

        let files = walk_files(temp_dir.path());
        let names: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["a.sav", "b.sav", "slot1/sub/deep.sav"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_files_reads_through_file_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("saves");
        sample_tree(&root);
        let outside = temp_dir.path().join("real.sav");
        fs::write(&outside, b"linked").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("slot.sav")).unwrap();
        std::os::unix::fs::symlink(root.join("slot1"), root.join("slot1-link")).unwrap();

        let files = walk_files(&root);
        let names: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["a.sav", "b.sav", "slot.sav", "slot1/sub/deep.sav"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_walk_files_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        sample_tree(temp_dir.path());
        fs::write(temp_dir.path().join(OsStr::from_bytes(b"bad\xff.sav")), b"x").unwrap();
        fs::write(temp_dir.path().join(OsStr::from_bytes(b"bad\xfe.sav")), b"y").unwrap();

        let files = walk_files(temp_dir.path());
        let names: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["a.sav", "b.sav", "slot1/sub/deep.sav"]);
    }

    #[test]
    fn test_dir_size() {
        let temp_dir = TempDir::new().unwrap();
        sample_tree(temp_dir.path());
        assert_eq!(dir_size(temp_dir.path()), 9);
    }

    #[test]
    fn test_copy_tree_with_skip() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        sample_tree(&src);
        fs::write(src.join("_backup_info.json"), b"{}").unwrap();

        let copied = copy_tree(&src, &dst, Some("_backup_info.json")).unwrap();
        assert_eq!(copied, 3);
        assert!(!dst.join("_backup_info.json").exists());
        assert_eq!(fs::read(dst.join("slot1/sub/deep.sav")).unwrap(), b"deep!");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_follows_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        sample_tree(&src);
        let outside = temp_dir.path().join("outside.sav");
        fs::write(&outside, b"outside").unwrap();
        std::os::unix::fs::symlink(&outside, src.join("linked.sav")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("gone"), src.join("dangling")).unwrap();

        let copied = copy_tree(&src, &dst, None).unwrap();
        assert_eq!(copied, 4);
        let linked = dst.join("linked.sav");
        assert!(!fs::symlink_metadata(&linked).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&linked).unwrap(), b"outside");
        assert!(fs::symlink_metadata(dst.join("dangling")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_rejects_link_loops() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        sample_tree(&src);
        std::os::unix::fs::symlink(&src, src.join("slot1/loop")).unwrap();

        assert!(copy_tree(&src, &temp_dir.path().join("dst"), None).is_err());
    }

    #[test]
    fn test_has_content() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty");
        fs::create_dir(&empty).unwrap();

        assert!(!has_content(&empty));
        assert!(!has_content(&temp_dir.path().join("missing")));
        assert!(has_content(temp_dir.path()));
    }

    #[test]
    fn test_unique_path() {
        let temp_dir = TempDir::new().unwrap();
        let (first, name) = unique_path(temp_dir.path(), "game_20240101_120000", ".zip");
        assert_eq!(name, "game_20240101_120000");
        fs::write(&first, b"x").unwrap();

        let (second, name) = unique_path(temp_dir.path(), "game_20240101_120000", ".zip");
        assert_eq!(name, "game_20240101_120000-2");
        assert_eq!(second, temp_dir.path().join("game_20240101_120000-2.zip"));
    }

    #[test]
    fn test_remove_path() {
        let temp_dir = TempDir::new().unwrap();
        sample_tree(&temp_dir.path().join("tree"));
        fs::write(temp_dir.path().join("file"), b"x").unwrap();

        remove_path(&temp_dir.path().join("tree")).unwrap();
        remove_path(&temp_dir.path().join("file")).unwrap();
        assert!(!temp_dir.path().join("tree").exists());
        assert!(!temp_dir.path().join("file").exists());
    }
}
