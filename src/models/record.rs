//! Backup record model
//!
//! A `BackupRecord` is the metadata embedded in every backup container. It is
//! written once when the snapshot is taken; only `display_name` and
//! `collection_id` are changed afterwards (by rename).

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::collection::DEFAULT_COLLECTION_ID;

/// Timestamp layout used in backup names (`{game_id}_{YYYYMMDD_HHMMSS}`)
pub const BACKUP_NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Number of hex characters kept from the tree digest
pub const CONTENT_HASH_LEN: usize = 16;

/// Short hex fingerprint of a source tree, used only for equality checks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Build a content hash from a full hex digest, keeping the first 16 characters
    pub fn from_digest(hex_digest: &str) -> Self {
        Self(hex_digest.chars().take(CONTENT_HASH_LEN).collect())
    }

    /// Wrap an already-truncated hash read back from metadata
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Archive format tag stored in the metadata record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Deflate-compressed zip archive
    #[default]
    Zip,
    /// Plain folder, no compression
    None,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => write!(f, "zip"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Metadata record embedded in each backup container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Game identifier the backup belongs to
    pub game_id: String,

    /// Human-readable game name at backup time
    #[serde(default)]
    pub game_name: String,

    /// Absolute source path that was backed up
    #[serde(default)]
    pub source_path: String,

    /// When the snapshot was taken (local time, ISO-8601)
    #[serde(with = "iso_time")]
    pub backup_time: NaiveDateTime,

    /// `{game_id}_{YYYYMMDD_HHMMSS}`
    pub backup_name: String,

    /// Free-text label, may be empty
    #[serde(default)]
    pub display_name: String,

    /// Collection this backup belongs to
    #[serde(default = "default_collection_id")]
    pub collection_id: String,

    /// Fingerprint of the source tree at backup time
    pub content_hash: ContentHash,

    /// Container format tag
    #[serde(default)]
    pub compression: Compression,
}

fn default_collection_id() -> String {
    DEFAULT_COLLECTION_ID.to_string()
}

impl BackupRecord {
    /// Create a record for a snapshot taken at `backup_time`
    pub fn new(
        game_id: impl Into<String>,
        game_name: impl Into<String>,
        source_path: impl Into<String>,
        backup_time: NaiveDateTime,
        content_hash: ContentHash,
    ) -> Self {
        let game_id = game_id.into();
        let backup_name = backup_name_for(&game_id, &backup_time);
        Self {
            game_id,
            game_name: game_name.into(),
            source_path: source_path.into(),
            backup_time,
            backup_name,
            display_name: String::new(),
            collection_id: default_collection_id(),
            content_hash,
            compression: Compression::Zip,
        }
    }

    /// Set the display label (trimmed)
    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.trim().to_string();
        self
    }

    /// Set the collection, falling back to the default collection when empty
    pub fn with_collection(mut self, collection_id: &str) -> Self {
        self.collection_id = normalize_collection_id(collection_id);
        self
    }

    /// Build a stand-in record for a container whose metadata is missing
    ///
    /// The game id and timestamp are recovered from the container name when it
    /// follows the `{game_id}_{YYYYMMDD_HHMMSS}` convention.
    pub fn placeholder(container_stem: &str) -> Self {
        let (game_id, backup_time) = match parse_backup_name(container_stem) {
            Some((game_id, time)) => (game_id.to_string(), time),
            None => (container_stem.to_string(), Local::now().naive_local()),
        };
        Self {
            game_id,
            game_name: String::new(),
            source_path: String::new(),
            backup_time,
            backup_name: container_stem.to_string(),
            display_name: String::new(),
            collection_id: default_collection_id(),
            content_hash: ContentHash::new(""),
            compression: Compression::Zip,
        }
    }

    /// Name shown to users: the display label if set, else the backup name
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.backup_name
        } else {
            &self.display_name
        }
    }
}

/// Map an empty collection id to the default collection
pub fn normalize_collection_id(collection_id: &str) -> String {
    let trimmed = collection_id.trim();
    if trimmed.is_empty() {
        default_collection_id()
    } else {
        trimmed.to_string()
    }
}

/// Derive the backup name for a game at a point in time
pub fn backup_name_for(game_id: &str, time: &NaiveDateTime) -> String {
    format!("{}_{}", game_id, time.format(BACKUP_NAME_TIME_FORMAT))
}

/// Split `{game_id}_{YYYYMMDD_HHMMSS}[-N]` into its game id and timestamp
pub fn parse_backup_name(name: &str) -> Option<(&str, NaiveDateTime)> {
    let base = match name.rsplit_once('-') {
        Some((base, counter)) if counter.chars().all(|c| c.is_ascii_digit()) => base,
        _ => name,
    };

    // "_YYYYMMDD_HHMMSS" is 16 bytes
    if base.len() < 17 || !base.is_char_boundary(base.len() - 16) {
        return None;
    }
    let (game_id, stamp) = base.split_at(base.len() - 16);
    let stamp = stamp.strip_prefix('_')?;
    let time = NaiveDateTime::parse_from_str(stamp, BACKUP_NAME_TIME_FORMAT).ok()?;
    Some((game_id, time))
}

/// A backup record decorated with on-disk facts, as shown by the catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub record: BackupRecord,

    /// Container path
    pub path: PathBuf,

    /// Archive file size, or recursive byte sum for folders
    pub size: u64,

    /// Whether the container is a compressed archive
    pub is_compressed: bool,

    /// Container modification time
    pub modified: DateTime<Local>,
}

/// Serde adapter for `backup_time`
///
/// Writes naive local ISO-8601. Reads naive ISO-8601 as well as RFC 3339 with
/// an offset, which is converted to local time.
mod iso_time {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(time) = NaiveDateTime::parse_from_str(&raw, FORMAT) {
            return Ok(time);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Local).naive_local())
            .map_err(serde::de::Error::custom)
    }
}
