//! Storage helpers for SaveVault
//!
//! - `file_io`: atomic JSON reads and writes used by the settings store
//! - `tree`: recursive walking, copying and sizing of directory trees

pub mod file_io;
pub mod tree;

pub use file_io::{read_json, write_json_atomic};
pub use tree::{copy_tree, dir_size, has_content, remove_path, unique_path, walk_files, TreeFile};
