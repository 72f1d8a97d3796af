// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "revlink")]
#[command(about = "Revision-based deployments of static build outputs over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new revlink.yml configuration file
    Init {
        /// Application name
        #[arg(long)]
        app: Option<String>,

        /// Remote host
        #[arg(long)]
        host: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Upload a revision to the configured host
    Deploy {
        /// Revision key identifying this build
        #[arg(short, long)]
        revision: String,

        /// Local directory containing the build output
        #[arg(short, long)]
        dist_dir: PathBuf,

        /// Switch the active pointer to this revision after uploading
        #[arg(long)]
        activate: bool,
    },

    /// Make a previously uploaded revision live
    Activate {
        /// Revision key to activate
        #[arg(short, long)]
        revision: String,
    },

    /// List deployed revisions, newest first
    Revisions,
}
