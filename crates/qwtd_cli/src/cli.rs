//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qwtd", version, about = "Quick notes kept in a local SQLite store")]
pub struct Cli {
    /// Configuration file (default: ~/.config/qwtd.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store file, overriding `db` from the configuration
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a note; new notes print their starting template
    Show { name: String },
    /// Save a note from a file or stdin (un-deletes it)
    Save {
        name: String,
        /// Read content from this file instead of stdin
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Move a note to the trash until its retention window passes
    Delete { name: String },
    /// Bring a deleted note back
    Restore { name: String },
    /// Permanently remove a deleted note now
    Purge { name: String },
    /// List note names
    List(ListArgs),
    /// Write a note to <DIR>/<NAME>.md
    Export { name: String, dir: PathBuf },
    /// Show store location, generation and retention window
    Status,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only deleted notes
    #[arg(long, conflicts_with = "all")]
    pub deleted: bool,
    /// Live and deleted notes
    #[arg(long)]
    pub all: bool,
    /// Print full records as JSON
    #[arg(long)]
    pub json: bool,
}
