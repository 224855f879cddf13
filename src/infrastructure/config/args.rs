//! Command-line arguments.

use super::app_config::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "webimage",
    version,
    about = "Fetch web images through a memory + disk cache",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", env = "WEBIMAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Root directory for the disk cache.
    #[arg(long, value_name = "PATH", env = "WEBIMAGE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Action to perform.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load an image through the cache, fetching it on a miss.
    Get {
        /// Image URL.
        url: String,

        /// Write the image to this file (format chosen by extension).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Remove an image from the cache.
    Remove {
        /// Image URL.
        url: String,
    },
    /// Remove every cached image.
    Clear,
    /// Print the cache key for a URL.
    Key {
        /// Image URL.
        url: String,

        /// Use the hash-based key provider.
        #[arg(long)]
        hashed: bool,
    },
}
