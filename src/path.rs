//! Path utilities.
//!
//! Webapp paths are `/`-separated strings independent of the host platform.
//! Filesystem paths are only produced at the edge, by directory-backed sets.

use std::io;
use std::path::{Path, PathBuf};

/// Normalize a `/`-prefixed webapp path.
///
/// Collapses repeated separators, drops `.` segments and resolves `..`
/// segments. A trailing separator is kept when the input had one, except when
/// the input ended in `/.` or `/..`.
///
/// Returns `None` when a `..` segment would climb above the root.
pub fn normalize(path: &str) -> Option<String> {
    let trailing = path.ends_with('/') && path.len() > 1;
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Some("/".to_string());
    }

    let mut out = String::with_capacity(path.len());
    for s in &segments {
        out.push('/');
        out.push_str(s);
    }
    if trailing {
        out.push('/');
    }
    Some(out)
}

/// Last non-empty segment of a webapp path (`""` for the root).
pub fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Append a trailing `/` unless the path already has one.
#[inline]
pub fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Canonicalize a path that may not exist yet.
///
/// Missing trailing components are appended verbatim to the canonical form of
/// the deepest existing ancestor. Returns `None` on any other I/O failure.
pub fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    match path.canonicalize() {
        Ok(canonical) => Some(canonical),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let parent = path.parent()?;
            let name = path.file_name()?;
            Some(canonicalize_lenient(parent)?.join(name))
        }
        Err(_) => None,
    }
}
