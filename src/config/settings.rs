//! User settings for SaveVault
//!
//! A flat JSON document holding the backup root, retention defaults, the
//! user's game list and each game's backup collections.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::env::expand_path;
use super::paths::VaultPaths;
use crate::backup::{ContainerFormat, RetentionSetting, DEFAULT_MAX_BACKUPS};
use crate::error::{VaultError, VaultResult};
use crate::models::Collection;
use crate::storage::{read_json, write_json_atomic};

/// A game the user has registered for backups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    pub id: String,
    pub name: String,
    /// Save directory; may contain environment variable references
    #[serde(default)]
    pub save_path: String,
}

/// User settings for SaveVault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Backup root; empty means `{base}/backups`
    #[serde(default)]
    pub backup_directory: String,

    /// Retention count for collections that enable retention without a limit
    #[serde(
        default = "default_max_backups",
        deserialize_with = "lenient_max_backups"
    )]
    pub max_backups: i64,

    /// Write zip archives (true) or plain folders (false)
    #[serde(default = "default_compress")]
    pub compress_backups: bool,

    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub user_games: Vec<GameEntry>,

    /// Collections per game id
    #[serde(default)]
    pub backup_collections: BTreeMap<String, Vec<Collection>>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_max_backups() -> i64 {
    DEFAULT_MAX_BACKUPS
}

fn default_compress() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup_directory: String::new(),
            max_backups: default_max_backups(),
            compress_backups: default_compress(),
            log_level: default_log_level(),
            user_games: Vec::new(),
            backup_collections: BTreeMap::new(),
        }
    }
}

/// Read a retention limit written as a number or a numeric string
fn parse_limit(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Deserialize an optional limit, mapping anything unusable to `None`
pub fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_limit))
}

fn lenient_max_backups<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_limit(deserializer)?.unwrap_or(DEFAULT_MAX_BACKUPS))
}

impl Settings {
    /// Load settings from disk, or defaults if the file doesn't exist
    ///
    /// Defaults are not written back; the caller decides when to persist.
    pub fn load_or_create(paths: &VaultPaths) -> VaultResult<Self> {
        read_json(paths.settings_file()).map_err(|e| VaultError::Config(e.to_string()))
    }

    /// Save settings to disk atomically
    pub fn save(&self, paths: &VaultPaths) -> VaultResult<()> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Backup root directory, with environment variables expanded
    pub fn backup_root(&self, paths: &VaultPaths) -> PathBuf {
        let configured = self.backup_directory.trim();
        if configured.is_empty() {
            paths.default_backup_dir()
        } else {
            expand_path(configured)
        }
    }

    /// Container format for new backups
    pub fn container_format(&self) -> ContainerFormat {
        if self.compress_backups {
            ContainerFormat::Archive
        } else {
            ContainerFormat::Folder
        }
    }

    pub fn find_game(&self, game_id: &str) -> Option<&GameEntry> {
        self.user_games.iter().find(|game| game.id == game_id)
    }

    /// Add a game or replace the entry with the same id
    ///
    /// Returns `true` when the game was not registered before.
    pub fn upsert_game(&mut self, entry: GameEntry) -> VaultResult<bool> {
        if entry.id.trim().is_empty() {
            return Err(VaultError::Validation("Game id must not be empty".into()));
        }
        match self.user_games.iter_mut().find(|game| game.id == entry.id) {
            Some(existing) => {
                *existing = entry;
                Ok(false)
            }
            None => {
                self.user_games.push(entry);
                Ok(true)
            }
        }
    }

    /// Unregister a game; its backups and collections are left alone
    pub fn remove_game(&mut self, game_id: &str) -> VaultResult<GameEntry> {
        let index = self
            .user_games
            .iter()
            .position(|game| game.id == game_id)
            .ok_or_else(|| VaultError::game_not_found(game_id))?;
        Ok(self.user_games.remove(index))
    }

    /// A game's collections, always starting with the default collection
    pub fn collections(&self, game_id: &str) -> Vec<Collection> {
        let stored = self
            .backup_collections
            .get(game_id)
            .cloned()
            .unwrap_or_default();
        with_default_first(stored)
    }

    /// Find a collection by id, or by name ignoring case
    pub fn find_collection(&self, game_id: &str, id_or_name: &str) -> Option<Collection> {
        let wanted = id_or_name.trim();
        let lowered = wanted.to_lowercase();
        let collections = self.collections(game_id);
        collections
            .iter()
            .find(|c| c.id == wanted)
            .or_else(|| collections.iter().find(|c| c.name.to_lowercase() == lowered))
            .cloned()
    }

    /// Retention settings that apply to backups in a collection
    pub fn collection_retention(&self, game_id: &str, collection_id: &str) -> RetentionSetting {
        match self.find_collection(game_id, collection_id) {
            Some(collection) if collection.id == collection_id => RetentionSetting {
                enabled: collection.limit_enabled,
                limit: collection.max_backups,
            },
            _ => RetentionSetting::disabled(),
        }
    }

    /// Create a collection and return its id
    ///
    /// A collection with the same name (ignoring case) is reused instead.
    pub fn create_collection(&mut self, game_id: &str, name: &str) -> VaultResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::Validation(
                "Collection name must not be empty".into(),
            ));
        }

        let collections = self.collections_mut(game_id);
        if let Some(existing) = collections
            .iter()
            .find(|c| c.name.to_lowercase() == name.to_lowercase())
        {
            return Ok(existing.id.clone());
        }

        let mut id = Collection::generate_id();
        while collections.iter().any(|c| c.id == id) {
            id = Collection::generate_id();
        }
        collections.push(Collection::new(id.clone(), name));
        Ok(id)
    }

    /// Give a collection a new, unique name
    pub fn rename_collection(
        &mut self,
        game_id: &str,
        collection_id: &str,
        new_name: &str,
    ) -> VaultResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(VaultError::Validation(
                "Collection name must not be empty".into(),
            ));
        }

        let collections = self.collections_mut(game_id);
        let taken = collections.iter().any(|c| {
            c.id != collection_id && c.name.to_lowercase() == new_name.to_lowercase()
        });
        if taken {
            return Err(VaultError::Validation(format!(
                "A collection named '{}' already exists",
                new_name
            )));
        }

        let collection = collections
            .iter_mut()
            .find(|c| c.id == collection_id)
            .ok_or_else(|| VaultError::collection_not_found(collection_id))?;
        collection.name = new_name.to_string();
        Ok(())
    }

    /// Remove a collection definition
    ///
    /// The default collection cannot be removed. Callers are expected to check
    /// that no backups still belong to it.
    pub fn delete_collection(&mut self, game_id: &str, collection_id: &str) -> VaultResult<()> {
        if collection_id == crate::models::DEFAULT_COLLECTION_ID {
            return Err(VaultError::Validation(
                "The default collection cannot be deleted".into(),
            ));
        }

        let collections = self.collections_mut(game_id);
        let index = collections
            .iter()
            .position(|c| c.id == collection_id)
            .ok_or_else(|| VaultError::collection_not_found(collection_id))?;
        collections.remove(index);
        Ok(())
    }

    /// Turn retention on or off for a collection
    pub fn set_collection_retention(
        &mut self,
        game_id: &str,
        collection_id: &str,
        enabled: bool,
        max_backups: Option<i64>,
    ) -> VaultResult<()> {
        if let Some(limit) = max_backups {
            if limit <= 0 {
                return Err(VaultError::RetentionLimitInvalid(limit));
            }
        }

        let collection = self
            .collections_mut(game_id)
            .iter_mut()
            .find(|c| c.id == collection_id)
            .ok_or_else(|| VaultError::collection_not_found(collection_id))?;
        collection.limit_enabled = enabled;
        if max_backups.is_some() {
            collection.max_backups = max_backups;
        }
        Ok(())
    }

    /// Stored collections of a game, materialized with the default first
    fn collections_mut(&mut self, game_id: &str) -> &mut Vec<Collection> {
        let entry = self
            .backup_collections
            .entry(game_id.to_string())
            .or_default();
        *entry = with_default_first(std::mem::take(entry));
        entry
    }
}

fn with_default_first(mut collections: Vec<Collection>) -> Vec<Collection> {
    match collections.iter().position(Collection::is_default) {
        Some(0) => {}
        Some(index) => {
            let default = collections.remove(index);
            collections.insert(0, default);
        }
        None => collections.insert(0, Collection::default_collection()),
    }
    collections
}
