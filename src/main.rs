use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use savevault::cli::{
    handle_backup_command, handle_collection_command, handle_game_command, BackupCommands,
    CliContext, CollectionCommands, GameCommands,
};
use savevault::config::{Settings, VaultPaths};

#[derive(Parser)]
#[command(
    name = "savevault",
    author = "Kaylee Beyene",
    version,
    about = "Versioned, deduplicated backups of game save directories",
    long_about = "SaveVault snapshots game save directories into compressed archives, \
                  skips snapshots that did not change, keeps a rolling number of \
                  backups per collection, and restores with a safety copy of \
                  whatever it overwrites."
)]
struct Cli {
    /// Log filter (e.g. "info", "savevault=debug"); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Backup(BackupCommands),

    /// Manage registered games
    #[command(subcommand)]
    Game(GameCommands),

    /// Manage backup collections
    #[command(subcommand)]
    Collection(CollectionCommands),

    /// Show current configuration and paths
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Initialize paths and settings
    let paths = VaultPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.log_level.clone());
    savevault::logging::init(&level);

    let mut ctx = CliContext::new(paths, settings);

    match cli.command {
        Some(Commands::Backup(cmd)) => handle_backup_command(&ctx, cmd)?,
        Some(Commands::Game(cmd)) => handle_game_command(&mut ctx, cmd)?,
        Some(Commands::Collection(cmd)) => handle_collection_command(&mut ctx, cmd)?,
        Some(Commands::Config) => {
            let settings = &ctx.settings;
            println!("SaveVault Configuration");
            println!("=======================");
            println!("Base directory:   {}", ctx.paths.base_dir().display());
            println!("Settings file:    {}", ctx.paths.settings_file().display());
            println!("Backup directory: {}", settings.backup_root(&ctx.paths).display());
            println!();
            println!("Settings:");
            println!("  Max backups:      {}", settings.max_backups);
            println!("  Compress backups: {}", settings.compress_backups);
            println!("  Log level:        {}", settings.log_level);
            println!("  Games registered: {}", settings.user_games.len());
        }
        None => {
            println!("SaveVault - versioned backups for game saves");
            println!();
            println!("Run 'savevault --help' for usage information.");
        }
    }

    Ok(())
}
