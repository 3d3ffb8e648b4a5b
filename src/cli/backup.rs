//! Backup CLI commands
//!
//! Create, list, inspect, restore, relabel and delete backups.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

use super::CliContext;
use crate::backup::{BackupEngine, BackupOutcome, BackupRequest, OperationReport};
use crate::display::backup::{
    format_all_backups, format_backup_details, format_backup_list, format_backup_list_verbose,
    format_size,
};
use crate::error::{VaultError, VaultResult};
use crate::models::record::parse_backup_name;
use crate::models::DEFAULT_COLLECTION_ID;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Back up a game's save directory
    Backup {
        /// Game id
        game_id: String,
        /// Game name (defaults to the registered name)
        #[arg(short, long)]
        name: Option<String>,
        /// Save directory (defaults to the registered save path)
        #[arg(short, long)]
        source: Option<String>,
        /// Write a backup even if nothing changed
        #[arg(short, long)]
        force: bool,
        /// Label shown instead of the backup name
        #[arg(short, long)]
        label: Option<String>,
        /// Collection id or name
        #[arg(short, long)]
        collection: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a game's backups, or every game's when no id is given, newest first
    List {
        /// Game id
        game_id: Option<String>,
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one backup's metadata and files
    Show {
        /// Backup path or name (e.g. eldenring_20240101_120000)
        backup: String,
    },

    /// Restore a backup, keeping a copy of the current saves
    Restore {
        /// Backup path or name
        backup: String,
        /// Target directory (defaults to the backup's source path)
        #[arg(short, long)]
        target: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a backup's label and optionally its collection
    Rename {
        /// Backup path or name
        backup: String,
        /// New label (empty to clear)
        display_name: String,
        /// Move the backup to this collection (id or name)
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Delete a backup
    Delete {
        /// Backup path or name
        backup: String,
    },
}

/// Handle a backup command
pub fn handle_backup_command(ctx: &CliContext, cmd: BackupCommands) -> VaultResult<()> {
    let engine = ctx.engine()?;

    match cmd {
        BackupCommands::Backup {
            game_id,
            name,
            source,
            force,
            label,
            collection,
            json,
        } => {
            let result = build_request(ctx, &game_id, name, source, force, label, collection)
                .and_then(|request| engine.backup_game(&request));

            if json {
                return print_report(result);
            }

            match result? {
                BackupOutcome::Created(summary) => {
                    println!("SUCCESS! Backup created: {}", summary.backup_name);
                    println!("  Location: {}", summary.path.display());
                    println!("  Size:     {}", format_size(summary.compressed_size));
                    if !summary.evicted.is_empty() {
                        println!("  Removed {} old backup(s)", summary.evicted.len());
                    }
                }
                BackupOutcome::Skipped { latest, .. } => {
                    println!("No changes detected - backup skipped");
                    println!("  Latest backup: {}", latest.display());
                }
            }
        }

        BackupCommands::List {
            game_id,
            verbose,
            json,
        } => {
            let result = match &game_id {
                Some(game_id) => engine.list_backups(game_id),
                None => engine.list_all_backups(),
            };
            if json {
                return print_report(result);
            }

            let entries = result?;
            let Some(game_id) = game_id else {
                if verbose {
                    print!("{}", format_backup_list_verbose(&entries, &[]));
                } else {
                    println!("{}", format_all_backups(&entries));
                }
                return Ok(());
            };

            let collections = ctx.settings.collections(&game_id);
            if verbose {
                print!("{}", format_backup_list_verbose(&entries, &collections));
            } else {
                println!("{}", format_backup_list(&entries, &collections));
            }
        }

        BackupCommands::Show { backup } => {
            let path = resolve_backup_path(&engine, &backup)?;
            let details = engine.backup_details(&path)?;
            print!("{}", format_backup_details(&details));
        }

        BackupCommands::Restore {
            backup,
            target,
            json,
        } => {
            let result = resolve_backup_path(&engine, &backup).and_then(|path| {
                let target = match target {
                    Some(target) => target,
                    None => default_target(&engine, &path)?,
                };
                engine.restore_backup(&path, &target)
            });

            if json {
                return print_report(result);
            }

            let report = result?;
            println!("SUCCESS! {}", report.summary());
        }

        BackupCommands::Rename {
            backup,
            display_name,
            collection,
        } => {
            let path = resolve_backup_path(&engine, &backup)?;
            let collection_id = match collection {
                Some(wanted) => {
                    let game_id = game_id_of(&engine, &path);
                    let found = ctx
                        .settings
                        .find_collection(&game_id, &wanted)
                        .ok_or_else(|| VaultError::collection_not_found(&wanted))?;
                    Some(found.id)
                }
                None => None,
            };

            let record = engine.rename_backup(&path, &display_name, collection_id.as_deref())?;
            println!("SUCCESS! Backup renamed: {}", record.label());
            println!("  Collection: {}", record.collection_id);
        }

        BackupCommands::Delete { backup } => {
            let path = resolve_backup_path(&engine, &backup)?;
            engine.delete_backup(&path)?;
            println!("SUCCESS! Backup deleted: {}", path.display());
        }
    }

    Ok(())
}

fn build_request(
    ctx: &CliContext,
    game_id: &str,
    name: Option<String>,
    source: Option<String>,
    force: bool,
    label: Option<String>,
    collection: Option<String>,
) -> VaultResult<BackupRequest> {
    let registered = ctx.settings.find_game(game_id);

    let game_name = name
        .or_else(|| registered.map(|game| game.name.clone()))
        .unwrap_or_default();
    let source_path = source
        .or_else(|| registered.map(|game| game.save_path.clone()))
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| {
            VaultError::Validation(format!(
                "No save path known for '{}'; pass --source or register it with 'game add'",
                game_id
            ))
        })?;

    let collection_id = match collection {
        Some(wanted) => {
            ctx.settings
                .find_collection(game_id, &wanted)
                .ok_or_else(|| VaultError::collection_not_found(&wanted))?
                .id
        }
        None => DEFAULT_COLLECTION_ID.to_string(),
    };
    let retention = ctx.settings.collection_retention(game_id, &collection_id);

    let mut request = BackupRequest::new(game_id, game_name, source_path)
        .force(force)
        .collection(collection_id)
        .retention(retention);
    if let Some(label) = label {
        request = request.display_name(label);
    }
    Ok(request)
}

/// Resolve a backup given as a path or as a backup name
///
/// Names are looked up in the backups of the game encoded in the name.
fn resolve_backup_path(engine: &BackupEngine, backup: &str) -> VaultResult<PathBuf> {
    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    let name = backup.trim_end_matches(".zip");
    if let Some((game_id, _)) = parse_backup_name(name) {
        let found = engine
            .list_backups(game_id)?
            .into_iter()
            .find(|entry| entry.record.backup_name == name || stem_of(&entry.path) == name);
        if let Some(entry) = found {
            return Ok(entry.path);
        }
    }

    Err(VaultError::backup_not_found(backup))
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn game_id_of(engine: &BackupEngine, path: &Path) -> String {
    match engine.backup_details(path) {
        Ok(details) => details.record.game_id,
        Err(_) => parse_backup_name(&stem_of(path))
            .map(|(game_id, _)| game_id.to_string())
            .unwrap_or_default(),
    }
}

fn default_target(engine: &BackupEngine, path: &Path) -> VaultResult<String> {
    let details = engine.backup_details(path)?;
    if details.record.source_path.trim().is_empty() {
        return Err(VaultError::Validation(
            "Backup does not record its source path; pass --target".into(),
        ));
    }
    Ok(details.record.source_path)
}

/// Print an operation result as a JSON report, failing after printing
fn print_report<T: Serialize>(result: VaultResult<T>) -> VaultResult<()> {
    match result {
        Ok(data) => {
            let report = OperationReport::from(Ok::<T, VaultError>(data));
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            let report = OperationReport::<T> {
                success: false,
                error: Some(e.to_string()),
                data: None,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Err(e)
        }
    }
}
