//! Collection CLI commands
//!
//! Collections group a game's backups and carry per-collection retention.

use clap::Subcommand;

use super::CliContext;
use crate::display::backup::format_collection_list;
use crate::error::{VaultError, VaultResult};
use crate::models::Collection;

/// Collection subcommands
#[derive(Subcommand)]
pub enum CollectionCommands {
    /// List a game's collections
    List {
        /// Game id
        game_id: String,
    },
    /// Create a collection (an existing one with the same name is reused)
    Add {
        /// Game id
        game_id: String,
        /// Collection name
        name: String,
    },
    /// Rename a collection
    Rename {
        /// Game id
        game_id: String,
        /// Collection id or name
        collection: String,
        /// New name
        new_name: String,
    },
    /// Remove an empty collection
    Remove {
        /// Game id
        game_id: String,
        /// Collection id or name
        collection: String,
    },
    /// Set how many backups a collection keeps
    Limit {
        /// Game id
        game_id: String,
        /// Collection id or name
        collection: String,
        /// Number of backups to keep (defaults to the global max_backups)
        #[arg(allow_negative_numbers = true)]
        count: Option<i64>,
        /// Disable retention for the collection
        #[arg(long, conflicts_with = "count")]
        off: bool,
    },
}

/// Handle a collection command
pub fn handle_collection_command(ctx: &mut CliContext, cmd: CollectionCommands) -> VaultResult<()> {
    match cmd {
        CollectionCommands::List { game_id } => {
            let collections = ctx.settings.collections(&game_id);
            print!(
                "{}",
                format_collection_list(&collections, ctx.settings.max_backups)
            );
        }

        CollectionCommands::Add { game_id, name } => {
            let id = ctx.settings.create_collection(&game_id, &name)?;
            ctx.save_settings()?;
            println!("Collection ready: {} ({})", name.trim(), id);
        }

        CollectionCommands::Rename {
            game_id,
            collection,
            new_name,
        } => {
            let found = find(ctx, &game_id, &collection)?;
            ctx.settings
                .rename_collection(&game_id, &found.id, &new_name)?;
            ctx.save_settings()?;
            println!("Renamed collection '{}' to '{}'", found.name, new_name.trim());
        }

        CollectionCommands::Remove {
            game_id,
            collection,
        } => {
            let found = find(ctx, &game_id, &collection)?;
            if found.is_default() {
                return Err(VaultError::Validation(
                    "The default collection cannot be deleted".into(),
                ));
            }
            if !ctx.engine()?.collection_is_empty(&game_id, &found.id)? {
                return Err(VaultError::Validation(format!(
                    "Collection '{}' still has backups; move or delete them first",
                    found.name
                )));
            }
            ctx.settings.delete_collection(&game_id, &found.id)?;
            ctx.save_settings()?;
            println!("Removed collection: {}", found.name);
        }

        CollectionCommands::Limit {
            game_id,
            collection,
            count,
            off,
        } => {
            let found = find(ctx, &game_id, &collection)?;
            ctx.settings
                .set_collection_retention(&game_id, &found.id, !off, count)?;
            ctx.save_settings()?;

            if off {
                println!("Retention disabled for '{}'", found.name);
            } else {
                let keep = count
                    .or(found.max_backups)
                    .unwrap_or(ctx.settings.max_backups);
                println!("'{}' keeps the newest {} backup(s)", found.name, keep);
            }
        }
    }

    Ok(())
}

fn find(ctx: &CliContext, game_id: &str, collection: &str) -> VaultResult<Collection> {
    ctx.settings
        .find_collection(game_id, collection)
        .ok_or_else(|| VaultError::collection_not_found(collection))
}
