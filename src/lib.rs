//! template-dir - Template Directory Synchronization
//!
//! Keeps an in-memory map of template key → content in agreement with a tree
//! of template files. [`DirectoryIndex::load`] pulls the tree into the map,
//! skipping files whose modification time has not moved;
//! [`DirectoryIndex::save`] pushes the map onto the tree, writing every key
//! and deleting files whose key is gone.

pub mod batch;
pub mod cli;
pub mod config;
pub mod directory;
pub mod entry;
pub mod error;
pub mod logging;
pub mod scanner;
pub mod signal;
pub mod snapshot;
pub mod watch;

pub use directory::{
    Cache, DirectoryError, DirectoryIndex, DirectoryOptions, LoadSummary, SaveSummary,
};
pub use entry::{FileEntry, FileError, LoadOutcome};

use anyhow::{Context, Result};
use std::io::Write;

use cli::{Cli, Commands, LoadArgs, SaveArgs, WatchArgs};
use config::Config;
use error::ExitCode;
use watch::{WatchExit, Watcher};

/// Run the command described by `cli`.
///
/// Logging is expected to be initialized by the caller.
///
/// # Errors
///
/// Returns an error if configuration, construction, or the command fails.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::try_load_from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::load(),
    };
    config.merge_cli(&cli);
    log::debug!("Effective config: {:?}", config);

    let mut index = DirectoryIndex::new(cli.command.root(), config.directory_options())
        .context("Failed to open template directory")?;

    match &cli.command {
        Commands::Load(args) => run_load(&mut index, args),
        Commands::Watch(args) => run_watch(&mut index, args, &config),
        Commands::Save(args) => run_save(&mut index, args),
    }
}

fn run_load(index: &mut DirectoryIndex, args: &LoadArgs) -> Result<ExitCode> {
    index
        .load()
        .with_context(|| format!("Failed to load {}", index.root().display()))?;

    match &args.output {
        Some(path) => snapshot::write_snapshot(path, index.cache())?,
        None => {
            let json = snapshot::to_json(index.cache())?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write to stdout")?;
        }
    }
    Ok(ExitCode::Success)
}

fn run_watch(index: &mut DirectoryIndex, args: &WatchArgs, config: &Config) -> Result<ExitCode> {
    let shutdown = signal::install_handler()?;
    let mut watcher = Watcher::new(args.output.clone(), config.poll_interval());
    if let Some(max) = args.max_polls {
        watcher = watcher.with_max_polls(max);
    }

    let report = watcher.run(index, &shutdown)?;
    Ok(match report.exit {
        WatchExit::Completed => ExitCode::Success,
        WatchExit::Interrupted => ExitCode::Interrupted,
    })
}

fn run_save(index: &mut DirectoryIndex, args: &SaveArgs) -> Result<ExitCode> {
    let desired = snapshot::read_snapshot(&args.input)?;
    // Track what is already on disk so keys missing from the snapshot are
    // deleted by the save.
    index
        .scan()
        .with_context(|| format!("Failed to scan {}", index.root().display()))?;
    index.set_cache(desired);
    let summary = index
        .save()
        .with_context(|| format!("Failed to save {}", index.root().display()))?;
    log::info!(
        "{}: {} written, {} removed",
        index.root().display(),
        summary.written,
        summary.removed
    );
    Ok(ExitCode::Success)
}
