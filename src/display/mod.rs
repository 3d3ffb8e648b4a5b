//! Display formatting for terminal output
//!
//! Plain-text tables and detail views for backups and collections.

pub mod backup;

pub use backup::{
    format_age, format_all_backups, format_backup_details, format_backup_list, format_backup_list_verbose,
    format_collection_list, format_size,
};
