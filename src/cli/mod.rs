pub mod commands;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "warbler")]
#[command(about = "A command-line client for timeline services", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/warbler/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Raise verbosity; repeat for response bodies in errors
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the configured timeline
    Timeline {
        /// Keep polling for new statuses
        #[arg(short, long)]
        watch: bool,

        /// Poll interval when watching (e.g., "90s", "5m")
        #[arg(short, long)]
        interval: Option<String>,
    },
    /// Search public statuses
    Search {
        query: String,
    },
    /// Follow the user stream until interrupted
    Stream,
    /// Post a status
    Post {
        /// Status text; multiple words are joined with spaces
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Exchange a username and password for an access token
    Token {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
}
