//! CLI module for Framefind.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Framefind - Video moment search
///
/// Finds moments in a video collection by what is on screen and what is
/// said, and resolves every hit to a playback position.
#[derive(Parser, Debug)]
#[command(name = "framefind")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "FRAMEFIND_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search by visual description, spoken words, or both
    Search {
        /// What is on screen
        description: Option<String>,

        /// Words spoken in the video
        #[arg(short, long)]
        transcript: Option<String>,

        /// Maximum number of results to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Resolve a keyframe to its playback position
    Resolve {
        /// Video ID
        video_id: String,

        /// Keyframe index within the video
        keyframe_index: String,
    },

    /// Index transcript segments against their nearest keyframes
    Ingest {
        /// Add to the existing index instead of recreating it
        #[arg(long)]
        append: bool,

        /// Transcript directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Measure video frame rates with ffprobe and save the table
    ProbeFps {
        /// Video directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Start the HTTP search server
    Serve {
        /// Host to bind to (defaults to the configured one)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured one)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
