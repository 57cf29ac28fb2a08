//! Two-way reconciliation between a template cache and a directory tree.
//!
//! # Overview
//!
//! A [`DirectoryIndex`] owns two maps:
//!
//! - `files`: key → [`FileEntry`], the templates it is tracking on disk;
//! - `cache`: key → content, the state callers read and edit.
//!
//! [`load`](DirectoryIndex::load) pulls the tree into the cache, and
//! [`save`](DirectoryIndex::save) pushes the cache onto the tree. Both heal
//! the other side: a load forgets templates that were deleted on disk, a save
//! deletes files whose key was dropped from the cache.
//!
//! # Concurrency
//!
//! Every top-level operation takes `&mut self`, so only one can run on an
//! instance at a time. Inside an operation, per-file work is fanned out over
//! a [`BatchExecutor`]. Nothing coordinates separate processes or instances
//! pointing at the same directory.
//!
//! # Example
//!
//! ```no_run
//! use template_dir::{DirectoryIndex, DirectoryOptions};
//!
//! let mut index = DirectoryIndex::new("/srv/views", DirectoryOptions::default())?;
//! index.load()?;
//! println!("{:?}", index.cache().get("index"));
//!
//! index.cache_mut().insert("drafts/new".to_string(), "<p>hi</p>".to_string());
//! index.cache_mut().remove("faq");
//! index.save()?;
//! # Ok::<(), template_dir::DirectoryError>(())
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::batch::BatchExecutor;
use crate::entry::{self, FileEntry, FileError};
use crate::scanner::{path_utils, ScanError, Scanner, ScannerConfig, DEFAULT_EXTENSION};

/// Key → content mapping exposed to callers.
pub type Cache = BTreeMap<String, String>;

/// Construction options, validated once by [`DirectoryIndex::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryOptions {
    /// Template suffix, with or without a leading dot. Default `"html"`.
    pub extension: String,
    /// Follow symlinks during discovery.
    pub follow_symlinks: bool,
    /// Skip dot-files and dot-directories during discovery.
    pub skip_hidden: bool,
    /// Dedicated I/O pool size; `None` uses rayon's global pool.
    pub io_threads: Option<usize>,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            follow_symlinks: false,
            skip_hidden: false,
            io_threads: None,
        }
    }
}

impl DirectoryOptions {
    /// Set the template extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Cap the number of I/O threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = Some(threads);
        self
    }
}

/// Errors from constructing or driving a [`DirectoryIndex`].
#[derive(thiserror::Error, Debug)]
pub enum DirectoryError {
    /// No root path was given.
    #[error("Template directory cannot be constructed without a root path")]
    MissingRoot,

    /// The root path could not be made absolute.
    #[error("Cannot resolve root {path}: {source}")]
    Root {
        /// Path as given
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configured extension is unusable.
    #[error("Invalid extension '{0}': must be non-empty and free of separators, whitespace and glob characters")]
    InvalidExtension(String),

    /// The discovery pattern failed to compile.
    #[error("Invalid discovery pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// A cache key does not map to a path inside the root.
    #[error("Invalid key '{0}': keys are '/'-separated names without empty, '.' or '..' segments")]
    InvalidKey(String),

    /// Enumeration failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A per-file operation failed.
    #[error(transparent)]
    File(#[from] FileError),
}

/// Outcome of a successful [`DirectoryIndex::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Templates discovered for the first time.
    pub discovered: usize,
    /// Keys dropped because their file became inaccessible.
    pub purged: Vec<String>,
    /// Templates whose content was (re)read.
    pub reloaded: usize,
    /// Templates tracked after the load.
    pub total: usize,
}

impl LoadSummary {
    /// Whether the cache may differ from before the load.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.discovered > 0 || self.reloaded > 0 || !self.purged.is_empty()
    }

    /// Templates served from the mtime cache without a read.
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.total.saturating_sub(self.reloaded)
    }
}

/// Outcome of a successful [`DirectoryIndex::save`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Files written.
    pub written: usize,
    /// Files deleted because their key left the cache.
    pub removed: usize,
}

/// Keeps a key → content cache and a directory of templates in agreement.
#[derive(Debug)]
pub struct DirectoryIndex {
    scanner: Scanner,
    executor: BatchExecutor,
    files: HashMap<String, FileEntry>,
    cache: Cache,
}

impl DirectoryIndex {
    /// Create an index rooted at `root`.
    ///
    /// The root is made absolute and cleaned lexically; it does not need to
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::MissingRoot`] for an empty path and
    /// [`DirectoryError::InvalidExtension`] for an unusable extension.
    pub fn new(root: impl AsRef<Path>, options: DirectoryOptions) -> Result<Self, DirectoryError> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(DirectoryError::MissingRoot);
        }
        let root = path_utils::normalize_root(root).map_err(|source| DirectoryError::Root {
            path: root.to_path_buf(),
            source,
        })?;
        let extension = path_utils::normalize_extension(&options.extension)
            .ok_or_else(|| DirectoryError::InvalidExtension(options.extension.clone()))?;

        let scanner = Scanner::new(
            root,
            ScannerConfig {
                extension,
                follow_symlinks: options.follow_symlinks,
                skip_hidden: options.skip_hidden,
            },
        )?;
        log::debug!("Template directory: {}", scanner.pattern());

        Ok(Self {
            scanner,
            executor: BatchExecutor::from_threads(options.io_threads),
            files: HashMap::new(),
            cache: Cache::new(),
        })
    }

    /// Create an index with default options.
    ///
    /// # Errors
    ///
    /// See [`DirectoryIndex::new`].
    pub fn with_defaults(root: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        Self::new(root, DirectoryOptions::default())
    }

    /// Normalized absolute root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.scanner.root()
    }

    /// Template extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.scanner.extension()
    }

    /// Key for an absolute template path under the root.
    #[must_use]
    pub fn normalize(&self, path: &Path) -> Option<String> {
        self.scanner.key_for(path)
    }

    /// Path a key is stored at.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.scanner.path_for(key)
    }

    /// Current cache.
    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Mutable cache; edits are written by the next [`save`](Self::save).
    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    /// Replace the whole cache.
    pub fn set_cache(&mut self, cache: Cache) {
        self.cache = cache;
    }

    /// Consume the index and return the cache.
    #[must_use]
    pub fn into_cache(self) -> Cache {
        self.cache
    }

    /// Tracked entry for `key`.
    #[must_use]
    pub fn file(&self, key: &str) -> Option<&FileEntry> {
        self.files.get(key)
    }

    /// Tracked keys, sorted.
    #[must_use]
    pub fn tracked_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.files.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Start tracking every newly discovered template.
    ///
    /// Returns how many entries were added.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Scan`] if enumeration fails; nothing is added.
    pub fn scan(&mut self) -> Result<usize, DirectoryError> {
        Ok(self.scanner.scan(&mut self.files)?)
    }

    /// Forget every tracked template that can no longer be opened.
    ///
    /// Returns the dropped keys, sorted. Never fails.
    pub fn purge(&mut self) -> Vec<String> {
        let mut gone = entry::check_all(&self.executor, self.files.iter());
        gone.sort_unstable();
        for key in &gone {
            self.files.remove(key);
            self.cache.remove(key);
            log::debug!("Purged {}", key);
        }
        gone
    }

    /// Pull the directory into the cache.
    ///
    /// Runs scan, purge and a parallel load of every tracked template, then
    /// replaces the cache with the tracked contents. Unchanged files are not
    /// re-read.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error. The cache keeps its previous
    /// contents, except for keys a completed purge already dropped.
    pub fn load(&mut self) -> Result<LoadSummary, DirectoryError> {
        let discovered = self.scan()?;
        let purged = self.purge();
        let reloaded = entry::load_all(&self.executor, self.files.values_mut())?;

        let files = &self.files;
        self.cache.retain(|key, _| files.contains_key(key));
        for (key, file) in files {
            if let Some(content) = file.content() {
                if self.cache.get(key).map(String::as_str) != Some(content) {
                    self.cache.insert(key.clone(), content.to_owned());
                }
            }
        }

        let summary = LoadSummary {
            discovered,
            purged,
            reloaded,
            total: self.files.len(),
        };
        log::info!(
            "Loaded {} templates ({} new, {} read, {} purged)",
            summary.total,
            summary.discovered,
            summary.reloaded,
            summary.purged.len()
        );
        Ok(summary)
    }

    /// Push the cache onto the directory.
    ///
    /// Writes one file per cache key, then deletes tracked files whose key is
    /// no longer in the cache. If any write fails, nothing is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidKey`] before touching the disk if a
    /// key cannot be mapped inside the root, otherwise the first write or
    /// delete failure.
    pub fn save(&mut self) -> Result<SaveSummary, DirectoryError> {
        if let Some(bad) = self.cache.keys().find(|key| !path_utils::is_valid_key(key)) {
            return Err(DirectoryError::InvalidKey(bad.clone()));
        }

        for (key, content) in &self.cache {
            let fresh = FileEntry::with_content(self.scanner.path_for(key), content.clone());
            self.files.insert(key.clone(), fresh);
        }

        let cache = &self.cache;
        let written = entry::save_all(
            &self.executor,
            self.files
                .iter()
                .filter(|(key, _)| cache.contains_key(*key))
                .map(|(_, file)| file),
        )?;

        let removed = self.remove_deprecated()?;
        log::info!("Saved {} templates, removed {}", written, removed);
        Ok(SaveSummary { written, removed })
    }

    /// Delete every tracked template whose key is not in the cache.
    ///
    /// Files that are already gone count as removed. If a deletion fails, the
    /// entries whose files still exist stay tracked so a later save retries.
    ///
    /// Returns how many entries were evicted.
    ///
    /// # Errors
    ///
    /// Returns the first deletion failure.
    pub fn remove_deprecated(&mut self) -> Result<usize, DirectoryError> {
        let stale: Vec<String> = self
            .files
            .keys()
            .filter(|key| !self.cache.contains_key(*key))
            .cloned()
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let evicted: Vec<(String, FileEntry)> = stale
            .into_iter()
            .filter_map(|key| self.files.remove(&key).map(|file| (key, file)))
            .collect();

        match entry::remove_all(&self.executor, evicted.iter().map(|(_, file)| file)) {
            Ok(count) => {
                for (key, _) in &evicted {
                    log::debug!("Removed deprecated {}", key);
                }
                Ok(count)
            }
            Err(e) => {
                for (key, file) in evicted {
                    if file.path().exists() {
                        self.files.insert(key, file);
                    }
                }
                Err(e.into())
            }
        }
    }
}
