pub mod import;
pub mod init;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::settings::{default_settings_path, shellexpand_path};

pub(crate) fn settings_path(config: Option<&str>) -> PathBuf {
    config
        .map(|c| PathBuf::from(shellexpand_path(c)))
        .unwrap_or_else(default_settings_path)
}

#[derive(Parser)]
#[command(
    name = "stackbook",
    about = "Import poker tournament summaries into a profit-and-loss database."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/stackbook/settings.json)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Show diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings, create the folders and the database.
    Init {
        /// Folder the summary files are dropped into
        #[arg(long = "input-dir")]
        input_dir: Option<String>,
        /// SQLite database path
        #[arg(long)]
        db: Option<String>,
    },
    /// Route every summary in the input folder and store cash results.
    Import {
        /// Override the configured input folder
        #[arg(long = "input-dir")]
        input_dir: Option<String>,
        /// Decide and log, but store and move nothing
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Show settings, database location and counts.
    Status,
}
