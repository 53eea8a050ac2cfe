//! Resources that do not exist.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{ResourceAttrs, ResourceStream, WebResource};
use crate::error::ResourceResult;
use crate::path::canonicalize_lenient;

/// The not-found sentinel.
///
/// Directory-backed sets remember the file the path would map to, so callers
/// can still ask where a new file would be created.
#[derive(Debug)]
pub struct EmptyResource {
    attrs: ResourceAttrs,
    file: Option<PathBuf>,
}

impl EmptyResource {
    /// Not-found resource for `webapp_path`.
    pub fn new(webapp_path: impl Into<String>) -> Self {
        Self {
            attrs: ResourceAttrs::new(webapp_path),
            file: None,
        }
    }

    /// Not-found resource that would live at `file`.
    pub fn at(webapp_path: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            attrs: ResourceAttrs::new(webapp_path),
            file: Some(file.into()),
        }
    }
}

impl WebResource for EmptyResource {
    fn attrs(&self) -> &ResourceAttrs {
        &self.attrs
    }

    fn exists(&self) -> bool {
        false
    }

    fn is_directory(&self) -> bool {
        false
    }

    fn is_file(&self) -> bool {
        false
    }

    fn content_length(&self) -> Option<u64> {
        None
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn canonical_path(&self) -> Option<PathBuf> {
        self.file.as_deref().and_then(canonicalize_lenient)
    }

    fn content(&self) -> ResourceResult<Option<Arc<[u8]>>> {
        Ok(None)
    }

    fn open(&self) -> ResourceResult<Option<ResourceStream>> {
        Ok(None)
    }
}

/// A directory that only exists because a set is mounted beneath it.
///
/// Mounting an archive at `/WEB-INF/lib/app` makes `/WEB-INF/lib` visible as a
/// virtual directory even when no set provides it.
#[derive(Debug)]
pub struct VirtualResource {
    attrs: ResourceAttrs,
}

impl VirtualResource {
    /// Virtual directory for `webapp_path`.
    pub fn new(webapp_path: impl Into<String>) -> Self {
        Self {
            attrs: ResourceAttrs::new(webapp_path),
        }
    }
}

impl WebResource for VirtualResource {
    fn attrs(&self) -> &ResourceAttrs {
        &self.attrs
    }

    fn exists(&self) -> bool {
        false
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn is_directory(&self) -> bool {
        true
    }

    fn is_file(&self) -> bool {
        false
    }

    fn content_length(&self) -> Option<u64> {
        None
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn content(&self) -> ResourceResult<Option<Arc<[u8]>>> {
        Ok(None)
    }

    fn open(&self) -> ResourceResult<Option<ResourceStream>> {
        Ok(None)
    }
}
