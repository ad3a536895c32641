use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(author, version, about = "Poster and caption builder for media file posts")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a filename and display the extracted metadata
    Parse {
        /// Filename to parse
        #[arg(required = true)]
        filename: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the full post (poster, caption, buttons) for one filename
    Process {
        /// Filename to process
        #[arg(required = true)]
        filename: String,

        /// Message id of the inbound file
        #[arg(long, default_value = "0")]
        message_id: i64,

        /// File size in bytes, shown on the download button
        #[arg(long)]
        size: Option<u64>,

        /// Image supplied with the file (path or transport id)
        #[arg(long)]
        image: Option<String>,

        /// Ignore the poster cache and fetch again
        #[arg(long)]
        refresh: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read `<message_id> <filename>` lines from stdin and process them concurrently
    Dispatch {
        /// Maximum number of queued events
        #[arg(long, default_value = "32")]
        capacity: usize,
    },

    /// Save a manual poster override for titles matching a hint
    Override {
        /// Title hint, matched loosely against parsed titles
        hint: String,

        /// Poster image (path or transport id)
        image: String,
    },

    /// Show whether a message id has been posted, or list recent posts
    History {
        /// Message id to look up
        message_id: Option<i64>,

        /// Number of recent posts to list when no message id is given
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
