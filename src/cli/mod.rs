//! Command-line interface.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub mod commands;
pub mod output;

pub use commands::Commands;

/// Simulate salary negotiations, estimate offer odds and learn which
/// tactics pay off.
#[derive(Parser, Debug)]
#[command(name = "offerlab", version, about, propagate_version = true)]
pub struct Cli {
    /// Machine-readable JSON on stdout, JSON logs on stderr
    #[arg(long, global = true)]
    pub robot: bool,

    /// More logging (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// No logging at all
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file to use instead of the global and project files
    #[arg(long, global = true, env = "OFFERLAB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
