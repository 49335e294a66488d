//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Metadata, structured data and share links for built documentation sites
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Config file (default: docmeta.toml)
    #[arg(short = 'C', long, default_value = "docmeta.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a default docmeta.toml
    Init,

    /// Augment every HTML page of a built site in place
    Process {
        /// Directory containing the built HTML
        site_dir: PathBuf,

        /// Markdown source directory (overrides `docs_dir`)
        #[arg(short, long)]
        docs: Option<PathBuf>,

        /// Public base URL of the site (overrides `site_url`).
        ///
        /// Example: docmeta process site --site-url "https://docs.example.com/"
        #[arg(long = "site-url")]
        site_url: Option<String>,

        /// Print one summary line per page
        #[arg(short, long)]
        verbose: bool,
    },
}

impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init)
    }
}
