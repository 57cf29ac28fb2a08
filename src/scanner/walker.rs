//! Recursive template enumeration with walkdir and globset.
//!
//! The scanner walks the whole tree first and only then touches the caller's
//! map, so a traversal error leaves the tracked set exactly as it was.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::{DirEntry, WalkDir};

use super::path_utils;
use super::{ScanError, ScannerConfig};
use crate::entry::FileEntry;

/// Discovers templates under a root directory.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    config: ScannerConfig,
    matcher: GlobMatcher,
}

impl Scanner {
    /// Create a scanner for `root`.
    ///
    /// `root` is expected to be normalized already (see
    /// [`path_utils::normalize_root`]).
    ///
    /// # Errors
    ///
    /// Returns a [`globset::Error`] if the discovery pattern does not compile.
    pub fn new(root: PathBuf, config: ScannerConfig) -> Result<Self, globset::Error> {
        let matcher = GlobBuilder::new(&format!("**/*.{}", config.extension))
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(Self {
            root,
            config,
            matcher,
        })
    }

    /// Root directory being scanned.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Template extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.config.extension
    }

    /// Human-readable discovery pattern, e.g. `/srv/views/**/*.html`.
    #[must_use]
    pub fn pattern(&self) -> String {
        format!("{}/**/*.{}", self.root.display(), self.config.extension)
    }

    /// Key for a path under the root.
    #[must_use]
    pub fn key_for(&self, path: &Path) -> Option<String> {
        path_utils::key_for_path(&self.root, &self.config.extension, path)
    }

    /// Path a key is stored at.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        path_utils::path_for_key(&self.root, &self.config.extension, key)
    }

    /// Enumerate every template path under the root, sorted by name.
    ///
    /// A missing root is an empty tree.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] if the root is not a directory or the traversal
    /// fails part-way.
    pub fn discover(&self) -> Result<Vec<PathBuf>, ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if !meta.is_dir() => {
                return Err(ScanError::NotADirectory(self.root.clone()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Root does not exist yet: {}", self.root.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.handle_io_error(&self.root, e)),
        }

        let skip_hidden = self.config.skip_hidden;
        let walk = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && is_hidden(entry)));

        let mut paths = Vec::new();
        for entry in walk {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => match self.handle_walk_error(e) {
                    Some(err) => return Err(err),
                    None => continue,
                },
            };

            // With follow_links the type is that of the target.
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                log::trace!("Skipping symlink: {}", entry.path().display());
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if self.matcher.is_match(relative) {
                paths.push(entry.into_path());
            }
        }

        log::debug!("Matched {} paths for {}", paths.len(), self.pattern());
        Ok(paths)
    }

    /// Add a [`FileEntry`] for every discovered template whose key is not in
    /// `files` yet. Existing entries are never touched or removed.
    ///
    /// Returns how many entries were added.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] if enumeration fails; `files` is unchanged.
    pub fn scan(&self, files: &mut HashMap<String, FileEntry>) -> Result<usize, ScanError> {
        let paths = self.discover()?;

        let mut added = 0;
        for path in paths {
            let Some(key) = self.key_for(&path) else {
                log::warn!("Skipping path without a usable key: {}", path.display());
                continue;
            };
            if !files.contains_key(&key) {
                log::trace!("Discovered {}", key);
                files.insert(key, FileEntry::new(path));
                added += 1;
            }
        }
        Ok(added)
    }

    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }

    /// Entries that vanish mid-walk are skipped; anything else aborts.
    fn handle_walk_error(&self, error: walkdir::Error) -> Option<ScanError> {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if error.io_error().map(std::io::Error::kind) == Some(ErrorKind::NotFound) {
            log::debug!("Entry vanished during scan: {}", path.display());
            return None;
        }

        let source = std::io::Error::from(error);
        Some(self.handle_io_error(&path, source))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}
