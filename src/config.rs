//! Layered application configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config PATH`, or `config.toml` in the platform config
//!    directory)
//! 3. environment variables prefixed `TEMPLATE_DIR_`
//! 4. command-line flags ([`Config::merge_cli`])
//!
//! ```toml
//! extension = "tmpl"
//! skip_hidden = true
//! io_threads = 4
//! poll_interval_ms = 500
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{Cli, Commands};
use crate::directory::DirectoryOptions;
use crate::scanner::DEFAULT_EXTENSION;

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "TEMPLATE_DIR_";

/// Default delay between polls in `watch`.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template file extension.
    pub extension: String,
    /// Follow symlinks during discovery.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Dedicated I/O pool size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
    /// Delay between polls in `watch`, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            follow_symlinks: false,
            skip_hidden: false,
            io_threads: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Load from the platform config file and the environment.
    ///
    /// The file is `config.toml` under [`Config::default_path`]; it does not
    /// have to exist.
    ///
    /// # Returns
    ///
    /// The merged configuration, or [`Config::default`] (with a debug log) if
    /// any source is malformed.
    #[must_use]
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_path(path),
            None => Self::extract(Self::figment(None)),
        }
    }

    /// Load from `path` and the environment. A missing file is not an error.
    ///
    /// # Arguments
    ///
    /// * `path` - TOML file layered over the defaults
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use template_dir::config::Config;
    ///
    /// let config = Config::load_from_path("/etc/template-dir/config.toml");
    /// println!("Watching *.{} files", config.extension);
    /// ```
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        Self::extract(Self::figment(Some(path.as_ref())))
    }

    /// Like [`Config::load_from_path`], but reports malformed sources.
    ///
    /// # Errors
    ///
    /// Returns the figment error if a source cannot be parsed into [`Config`].
    pub fn try_load_from_path(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment(Some(path.as_ref())).extract()
    }

    /// Apply command-line overrides.
    ///
    /// Only flags the user actually passed are applied, so a value from the
    /// file or the environment survives an absent flag.
    /// `--no-follow-symlinks` can switch off a `follow_symlinks = true` from
    /// the file; `--interval` only applies to `watch`.
    ///
    /// # Arguments
    ///
    /// * `cli` - Parsed command line
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(extension) = &cli.extension {
            self.extension.clone_from(extension);
        }
        if cli.io_threads.is_some() {
            self.io_threads = cli.io_threads;
        }
        if cli.follow_symlinks {
            self.follow_symlinks = true;
        } else if cli.no_follow_symlinks {
            self.follow_symlinks = false;
        }
        if cli.skip_hidden {
            self.skip_hidden = true;
        }
        if let Commands::Watch(args) = &cli.command {
            if let Some(interval) = args.interval {
                self.poll_interval_ms = interval;
            }
        }
    }

    /// Options for [`DirectoryIndex::new`](crate::DirectoryIndex::new).
    #[must_use]
    pub fn directory_options(&self) -> DirectoryOptions {
        DirectoryOptions {
            extension: self.extension.clone(),
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            io_threads: self.io_threads,
        }
    }

    /// Delay between polls in `watch`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Platform-specific config file location.
    ///
    /// # Returns
    ///
    /// - Linux: `~/.config/template-dir/config.toml`
    /// - macOS: `~/Library/Application Support/com.template-dir.template-dir/config.toml`
    /// - Windows: `%APPDATA%\template-dir\template-dir\config\config.toml`
    ///
    /// `None` if no home directory can be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "template-dir", "template-dir")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Self {
        match figment.extract() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }
}
