//! Template discovery.
//!
//! This module provides:
//! - [`Scanner`]: recursive enumeration of `root/**/*.<extension>`
//! - [`path_utils`]: the key ⇄ path mapping used across the crate
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::path::PathBuf;
//! use template_dir::scanner::{Scanner, ScannerConfig};
//!
//! let scanner = Scanner::new(PathBuf::from("/srv/views"), ScannerConfig::default()).unwrap();
//! let mut files = HashMap::new();
//! let added = scanner.scan(&mut files).unwrap();
//! println!("Tracking {} new templates", added);
//! ```

pub mod path_utils;
pub mod walker;

use std::path::PathBuf;

pub use walker::Scanner;

/// Default template extension.
pub const DEFAULT_EXTENSION: &str = "html";

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// File suffix without the dot.
    pub extension: String,

    /// Follow symbolic links during traversal.
    /// When false, symlinks are skipped entirely.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            follow_symlinks: false,
            skip_hidden: false,
        }
    }
}

/// Errors that abort an enumeration.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied while traversing.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The root exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Any other traversal failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
