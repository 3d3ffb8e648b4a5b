//! Backup directory resolution
//!
//! Each game's backups live in one directory under the backup root. Two naming
//! schemes exist on disk:
//!
//! - legacy: `{root}/{game_id}`
//! - preferred: `{root}/{sanitized_name}__{game_id}`
//!
//! Resolution migrates a legacy directory to the preferred name when it can and
//! never loses data when it cannot. Listing finds directories of both forms.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{VaultError, VaultResult};

/// Maximum length (in characters) of the readable part of a directory name
const MAX_FOLDER_NAME_CHARS: usize = 40;

/// Separator between the readable name and the game id
const NAME_SEPARATOR: &str = "__";

/// Maps games to backup directories
pub trait DirectoryResolver {
    /// Root under which all game directories live
    fn root(&self) -> &Path;

    /// Directory new backups for this game are written to (created if needed)
    fn resolve(&self, game_id: &str, game_name: Option<&str>) -> VaultResult<PathBuf>;

    /// Every existing directory holding backups for this game
    fn find_all(&self, game_id: &str) -> Vec<PathBuf>;
}

/// Resolver for the legacy and `name__id` directory layouts
#[derive(Debug, Clone)]
pub struct GameDirectoryResolver {
    root: PathBuf,
}

impl GameDirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{root}/{game_id}`
    pub fn legacy_dir(&self, game_id: &str) -> PathBuf {
        self.root.join(game_id)
    }

    /// `{root}/{sanitized}__{game_id}`, or the legacy directory when the name
    /// sanitizes to nothing
    pub fn preferred_dir(&self, game_id: &str, game_name: Option<&str>) -> PathBuf {
        let safe_name = sanitize_folder_name(game_name.unwrap_or(""));
        if safe_name.is_empty() {
            self.legacy_dir(game_id)
        } else {
            self.root
                .join(format!("{}{}{}", safe_name, NAME_SEPARATOR, game_id))
        }
    }
}

impl DirectoryResolver for GameDirectoryResolver {
    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, game_id: &str, game_name: Option<&str>) -> VaultResult<PathBuf> {
        if game_id.trim().is_empty() {
            return Err(VaultError::Validation("Game id must not be empty".into()));
        }

        let legacy = self.legacy_dir(game_id);
        let preferred = self.preferred_dir(game_id, game_name);

        if preferred.is_dir() {
            return Ok(preferred);
        }

        if legacy.is_dir() && preferred != legacy {
            return match fs::rename(&legacy, &preferred) {
                Ok(()) => {
                    info!(
                        from = %legacy.display(),
                        to = %preferred.display(),
                        "migrated legacy backup directory"
                    );
                    Ok(preferred)
                }
                Err(e) => {
                    warn!(
                        dir = %legacy.display(),
                        error = %e,
                        "could not migrate legacy backup directory; using it as-is"
                    );
                    Ok(legacy)
                }
            };
        }

        fs::create_dir_all(&preferred).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create backup directory {}: {}",
                preferred.display(),
                e
            ))
        })?;
        debug!(dir = %preferred.display(), "created backup directory");
        Ok(preferred)
    }

    fn find_all(&self, game_id: &str) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        let legacy = self.legacy_dir(game_id);
        if legacy.is_dir() {
            dirs.push(legacy);
        }

        let suffix = format!("{}{}", NAME_SEPARATOR, game_id);
        if let Ok(entries) = fs::read_dir(&self.root) {
            let mut named: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    entry.file_name().to_string_lossy().ends_with(&suffix)
                        && entry.path().is_dir()
                })
                .map(|entry| entry.path())
                .filter(|path| !dirs.contains(path))
                .collect();
            named.sort();
            dirs.extend(named);
        }

        dirs
    }
}

/// Build a filesystem-safe folder name from a game name
///
/// Keeps word characters, whitespace and hyphens; collapses whitespace runs to
/// single underscores; trims leading/trailing underscores and hyphens; keeps
/// at most 40 characters.
pub fn sanitize_folder_name(name: &str) -> String {
    let kept: String = name
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join("_");
    collapsed
        .trim_matches(|c| c == '_' || c == '-')
        .chars()
        .take(MAX_FOLDER_NAME_CHARS)
        .collect()
}
