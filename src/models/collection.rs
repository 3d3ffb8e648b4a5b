//! Collection model
//!
//! A collection is a label carried by each backup record. It scopes rolling
//! retention and groups backups for display; it is not a directory on disk.

use serde::{Deserialize, Serialize};

/// Identifier of the collection every game implicitly has
pub const DEFAULT_COLLECTION_ID: &str = "default";

/// Display name of the default collection
pub const DEFAULT_COLLECTION_NAME: &str = "Main";

/// A named collection of a game's backups, with its retention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Short identifier stored in backup metadata
    pub id: String,

    /// User-facing name
    pub name: String,

    /// Whether rolling retention is enforced for this collection
    #[serde(default)]
    pub limit_enabled: bool,

    /// Maximum number of backups kept when retention is enabled
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::config::settings::lenient_limit"
    )]
    pub max_backups: Option<i64>,
}

impl Collection {
    /// Create a collection without retention
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            limit_enabled: false,
            max_backups: None,
        }
    }

    /// The implicit default collection
    pub fn default_collection() -> Self {
        Self::new(DEFAULT_COLLECTION_ID, DEFAULT_COLLECTION_NAME)
    }

    /// Generate a fresh collection id (8 hex characters)
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    /// Check if this is the default collection
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_COLLECTION_ID
    }
}
