//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Print every template under ./views as JSON
//! template-dir load ./views
//!
//! # Keep ./cache.json in step with ./views, polling every 500ms
//! template-dir watch ./views --output cache.json --interval 500
//!
//! # Make ./views mirror an edited snapshot (writes and deletes files)
//! template-dir save ./views --input cache.json
//!
//! # Work on .tmpl files instead of .html
//! template-dir --extension tmpl load ./views
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Keep a directory of templates and a JSON key → content map in sync.
#[derive(Debug, Parser)]
#[command(name = "template-dir")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML). Defaults to the platform config directory.
    #[arg(long, value_name = "PATH", global = true, env = "TEMPLATE_DIR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Template file extension (default: html)
    #[arg(short, long, value_name = "EXT", global = true)]
    pub extension: Option<String>,

    /// Number of I/O threads (default: rayon's global pool)
    #[arg(long, value_name = "N", global = true)]
    pub io_threads: Option<usize>,

    /// Follow symbolic links while discovering templates
    #[arg(long, global = true, overrides_with = "no_follow_symlinks")]
    pub follow_symlinks: bool,

    /// Do not follow symbolic links (overrides config)
    #[arg(long, global = true, overrides_with = "follow_symlinks")]
    pub no_follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long, global = true)]
    pub skip_hidden: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load the directory once and emit the cache as JSON
    Load(LoadArgs),
    /// Poll the directory and keep a JSON snapshot up to date
    Watch(WatchArgs),
    /// Make the directory mirror a JSON snapshot
    Save(SaveArgs),
}

/// Arguments for `load`.
#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Template directory
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Write the snapshot here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for `watch`.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Template directory
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Snapshot file rewritten whenever the directory changes
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Milliseconds between the end of one poll and the start of the next
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,

    /// Stop after this many polls
    #[arg(long, value_name = "N")]
    pub max_polls: Option<usize>,
}

/// Arguments for `save`.
#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Template directory
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Snapshot to apply (JSON object of key → content)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,
}

impl Commands {
    /// Template directory the command operates on.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        match self {
            Self::Load(args) => &args.root,
            Self::Watch(args) => &args.root,
            Self::Save(args) => &args.root,
        }
    }
}
