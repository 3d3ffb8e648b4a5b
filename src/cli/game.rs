//! Game CLI commands
//!
//! Register the games whose save directories should be backed up.

use clap::Subcommand;

use super::CliContext;
use crate::config::GameEntry;
use crate::error::VaultResult;

/// Game subcommands
#[derive(Subcommand)]
pub enum GameCommands {
    /// Register a game or update its name and save path
    Add {
        /// Game id, used in backup names
        id: String,
        /// Display name
        name: String,
        /// Save directory; `$VAR`, `${VAR}` and `%VAR%` are expanded at backup time
        save_path: String,
    },
    /// List registered games
    List,
    /// Unregister a game (its backups are kept)
    Remove {
        /// Game id
        id: String,
    },
}

/// Handle a game command
pub fn handle_game_command(ctx: &mut CliContext, cmd: GameCommands) -> VaultResult<()> {
    match cmd {
        GameCommands::Add {
            id,
            name,
            save_path,
        } => {
            let created = ctx.settings.upsert_game(GameEntry {
                id: id.trim().to_string(),
                name: name.trim().to_string(),
                save_path,
            })?;
            ctx.save_settings()?;
            if created {
                println!("Added game: {} ({})", name.trim(), id.trim());
            } else {
                println!("Updated game: {} ({})", name.trim(), id.trim());
            }
        }

        GameCommands::List => {
            if ctx.settings.user_games.is_empty() {
                println!("No games registered.");
                println!("Add one with: savevault game add <id> <name> <save_path>");
                return Ok(());
            }

            let id_width = ctx
                .settings
                .user_games
                .iter()
                .map(|g| g.id.len())
                .max()
                .unwrap_or(2)
                .max(2);
            let name_width = ctx
                .settings
                .user_games
                .iter()
                .map(|g| g.name.chars().count())
                .max()
                .unwrap_or(4)
                .max(4);

            println!(
                "{:<id_width$}  {:<name_width$}  Save path",
                "ID",
                "Name",
                id_width = id_width,
                name_width = name_width
            );
            for game in &ctx.settings.user_games {
                println!(
                    "{:<id_width$}  {:<name_width$}  {}",
                    game.id,
                    game.name,
                    game.save_path,
                    id_width = id_width,
                    name_width = name_width
                );
            }
        }

        GameCommands::Remove { id } => {
            let removed = ctx.settings.remove_game(&id)?;
            ctx.save_settings()?;
            println!("Removed game: {} ({})", removed.name, removed.id);
        }
    }

    Ok(())
}
