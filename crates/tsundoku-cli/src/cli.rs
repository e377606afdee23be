use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tsundoku", version, about = "Manage a local book/gallery library")]
pub struct Cli {
    /// Settings file (defaults to the platform config dir).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database file (defaults to the platform data dir).
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and change settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Manage stored content.
    #[command(subcommand)]
    Library(LibraryCommand),
    /// Edit metadata of a stored record.
    #[command(subcommand)]
    Edit(EditCommand),
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show a settings screen with current values.
    Show {
        /// Screen key (top level when omitted).
        screen: Option<String>,
    },
    Get {
        key: String,
    },
    Set {
        key: String,
        value: String,
    },
    /// Trigger a settings item (refresh, export, delete-all-except-favs...).
    Activate {
        key: String,
        /// Answer yes to confirmation prompts.
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum LibraryCommand {
    /// Add a record with numbered page images.
    Add {
        title: String,
        /// Number of pages to register.
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long)]
        favourite: bool,
    },
    List {
        #[arg(long)]
        json: bool,
    },
    /// Mark or unmark a record as favourite.
    Favourite {
        id: i64,
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum EditCommand {
    /// Pick the cover image of a record by page position.
    Cover {
        id: i64,
        order: u32,
        /// Show the result without saving it.
        #[arg(long)]
        dry_run: bool,
    },
}
