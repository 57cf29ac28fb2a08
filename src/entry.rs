//! Tracked template files.
//!
//! A [`FileEntry`] binds one path on disk to its last observed modification
//! time and its text content. Loading is gated by the modification time so
//! polling an unchanged file costs one `stat` and no read.
//!
//! # Timestamp resolution
//!
//! Change detection compares modification times only. Two writes that land
//! within one timestamp quantum of the filesystem leave the mtime unchanged,
//! and the second write is not picked up until the file is touched again.
//!
//! The batch helpers at the bottom of this module ([`load_all`],
//! [`check_all`], [`save_all`], [`remove_all`]) fan entries out over a
//! [`BatchExecutor`].

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use crate::batch::BatchExecutor;

/// Errors raised by per-file operations.
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// The file (or one of its parents) does not exist.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied for the file or its directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Any other I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A save was requested before any content was assigned.
    #[error("No content to save for {0}")]
    MissingContent(PathBuf),
}

impl FileError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) | Self::MissingContent(path) => {
                path
            }
            Self::Io { path, .. } => path,
        }
    }
}

/// What a successful [`FileEntry::load`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read and the content replaced.
    Loaded,
    /// The modification time had not advanced; nothing was read.
    Unchanged,
}

/// One tracked file: path, last observed mtime, content.
#[derive(Debug, Clone)]
pub struct FileEntry {
    path: PathBuf,
    mtime: Option<SystemTime>,
    content: Option<String>,
}

impl FileEntry {
    /// Track `path` with nothing loaded yet.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            mtime: None,
            content: None,
        }
    }

    /// Track `path` with content assigned for a save.
    #[must_use]
    pub fn with_content(path: PathBuf, content: String) -> Self {
        Self {
            path,
            mtime: None,
            content: Some(content),
        }
    }

    /// Absolute path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time seen by the last read, if any.
    #[must_use]
    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    /// Current content, if loaded or assigned.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Assign content ahead of a [`save`](Self::save).
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }

    /// Refresh the content if the file changed since the last read.
    ///
    /// The file is read when no mtime has been recorded yet, or when the
    /// mtime on disk is strictly later than the recorded one. Content and
    /// mtime are only updated together, after a successful read.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the metadata or the content cannot be read.
    /// The entry is left untouched in that case.
    pub fn load(&mut self) -> Result<LoadOutcome, FileError> {
        let metadata = fs::metadata(&self.path).map_err(|e| FileError::from_io(&self.path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| FileError::from_io(&self.path, e))?;

        let stale = match self.mtime {
            None => true,
            Some(seen) => modified > seen,
        };
        if !stale {
            log::trace!("Unchanged: {}", self.path.display());
            return Ok(LoadOutcome::Unchanged);
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| FileError::from_io(&self.path, e))?;
        log::trace!("Read {} bytes from {}", content.len(), self.path.display());
        self.content = Some(content);
        self.mtime = Some(modified);
        Ok(LoadOutcome::Loaded)
    }

    /// Write the assigned content to disk, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::MissingContent`] if no content was assigned, or an
    /// I/O variant if the directories or the file cannot be written.
    pub fn save(&self) -> Result<(), FileError> {
        let content = self
            .content
            .as_deref()
            .ok_or_else(|| FileError::MissingContent(self.path.clone()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| FileError::from_io(parent, e))?;
        }
        fs::write(&self.path, content).map_err(|e| FileError::from_io(&self.path, e))?;
        log::trace!("Wrote {} bytes to {}", content.len(), self.path.display());
        Ok(())
    }

    /// Delete the file.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file cannot be removed.
    pub fn remove(&self) -> Result<(), FileError> {
        fs::remove_file(&self.path).map_err(|e| FileError::from_io(&self.path, e))?;
        log::trace!("Removed {}", self.path.display());
        Ok(())
    }

    /// Whether the path is still a regular file that can be opened for
    /// reading. A directory or other non-file at the path is inaccessible.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                log::debug!("Inaccessible: {} (not a regular file)", self.path.display());
                return false;
            }
            Err(e) => {
                log::debug!("Inaccessible: {} ({})", self.path.display(), e);
                return false;
            }
        }
        match File::open(&self.path) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Inaccessible: {} ({})", self.path.display(), e);
                false
            }
        }
    }
}

/// Load every entry in parallel.
///
/// Returns how many entries were actually read (the rest were unchanged).
///
/// # Errors
///
/// Returns the first [`FileError`] observed; all entries are still attempted.
pub fn load_all<'a, I>(executor: &BatchExecutor, entries: I) -> Result<usize, FileError>
where
    I: IntoIterator<Item = &'a mut FileEntry>,
{
    let reloaded = AtomicUsize::new(0);
    executor.run(entries, |entry| {
        if entry.load()? == LoadOutcome::Loaded {
            reloaded.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    })?;
    Ok(reloaded.into_inner())
}

/// Probe every entry for read access and return the keys of the ones that
/// cannot be opened.
///
/// Never fails: inaccessibility is the result.
pub fn check_all<'a, I>(executor: &BatchExecutor, entries: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a FileEntry)>,
{
    executor
        .select(entries, |(_, entry)| !entry.is_accessible())
        .into_iter()
        .map(|(key, _)| key.clone())
        .collect()
}

/// Save every entry in parallel.
///
/// # Errors
///
/// Returns the first [`FileError`] observed; all entries are still attempted.
pub fn save_all<'a, I>(executor: &BatchExecutor, entries: I) -> Result<usize, FileError>
where
    I: IntoIterator<Item = &'a FileEntry>,
{
    executor.run(entries, FileEntry::save)
}

/// Delete every entry's file in parallel.
///
/// A file that is already gone counts as removed.
///
/// # Errors
///
/// Returns the first other [`FileError`] observed; all entries are still
/// attempted.
pub fn remove_all<'a, I>(executor: &BatchExecutor, entries: I) -> Result<usize, FileError>
where
    I: IntoIterator<Item = &'a FileEntry>,
{
    executor.run(entries, |entry| match entry.remove() {
        Err(FileError::NotFound(path)) => {
            log::debug!("Already removed: {}", path.display());
            Ok(())
        }
        other => other,
    })
}
