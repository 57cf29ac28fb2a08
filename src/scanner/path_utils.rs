//! Mapping between template keys and file paths.
//!
//! A key is the path of a template relative to the root, with `/` as the
//! separator on every platform and without the extension suffix:
//!
//! ```
//! use std::path::Path;
//! use template_dir::scanner::path_utils::{key_for_path, path_for_key};
//!
//! let root = Path::new("/srv/views");
//! let key = key_for_path(root, "html", Path::new("/srv/views/sub/widget.html"));
//! assert_eq!(key.as_deref(), Some("sub/widget"));
//!
//! assert_eq!(
//!     path_for_key(root, "html", "sub/widget"),
//!     Path::new("/srv/views/sub/widget.html")
//! );
//! ```
//!
//! [`key_for_path`] and [`path_for_key`] are exact inverses for every key
//! accepted by [`is_valid_key`].

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Characters that would change the meaning of the discovery glob.
const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}', '!', '\\', '/'];

/// Make `path` absolute and remove `.`/`..` components and trailing
/// separators, without touching the filesystem.
///
/// # Errors
///
/// Fails only if the current directory is needed and cannot be determined.
pub fn normalize_root(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Validate a configured extension and strip one leading dot.
///
/// Returns `None` for empty extensions or ones containing separators or
/// glob metacharacters.
#[must_use]
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.strip_prefix('.').unwrap_or(raw);
    if ext.is_empty() || ext.contains(GLOB_META) || ext.chars().any(char::is_whitespace) {
        return None;
    }
    Some(ext.to_string())
}

/// Derive the key for `path`, or `None` if the path is not a template under
/// `root` (outside the root, wrong suffix, non-UTF-8, or no file stem).
#[must_use]
pub fn key_for_path(root: &Path, extension: &str, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }

    let joined = parts.join("/");
    let key = joined.strip_suffix(&format!(".{extension}"))?;
    if key.is_empty() || key.ends_with('/') {
        return None;
    }
    Some(key.to_string())
}

/// Build the path a key is stored at: `root/<key>.<extension>`.
#[must_use]
pub fn path_for_key(root: &Path, extension: &str, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    let mut parts = key.split('/').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_some() {
            path.push(part);
        } else {
            path.push(format!("{part}.{extension}"));
        }
    }
    path
}

/// Whether `key` maps to a path strictly inside the root.
///
/// Every `/`-separated segment must be a single plain path component: no
/// empty segments, no `.` or `..`, no platform separators or prefixes.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.split('/').all(|part| {
            let mut components = Path::new(part).components();
            matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(name)), None) if name == OsStr::new(part)
            )
        })
}
