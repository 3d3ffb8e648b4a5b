//! Configuration module for SaveVault
//!
//! - Base directory resolution (`SAVEVAULT_HOME` or the platform default)
//! - User settings persistence (`config.json`)
//! - Environment variable expansion for user-supplied paths

pub mod env;
pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{GameEntry, Settings};
