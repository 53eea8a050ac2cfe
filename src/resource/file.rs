//! Files and directories on disk.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{ResourceAttrs, ResourceStream, WebResource, to_utc};
use crate::error::ResourceResult;

/// A file or directory on disk.
///
/// Metadata is read from the filesystem on every call, so this resource always
/// reflects the current state of the file. Caching happens one layer up.
#[derive(Debug)]
pub struct FileResource {
    attrs: ResourceAttrs,
    file: PathBuf,
    read_only: bool,
}

impl FileResource {
    /// Create a resource for `file`, answering for `webapp_path`.
    pub fn new(webapp_path: impl Into<String>, file: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            attrs: ResourceAttrs::new(webapp_path),
            file: file.into(),
            read_only,
        }
    }

    /// The file on disk.
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn metadata(&self) -> Option<fs::Metadata> {
        fs::metadata(&self.file).ok()
    }
}

impl WebResource for FileResource {
    fn attrs(&self) -> &ResourceAttrs {
        &self.attrs
    }

    fn exists(&self) -> bool {
        self.file.exists()
    }

    fn is_directory(&self) -> bool {
        self.metadata().is_some_and(|m| m.is_dir())
    }

    fn is_file(&self) -> bool {
        self.metadata().is_some_and(|m| m.is_file())
    }

    fn content_length(&self) -> Option<u64> {
        self.metadata().filter(|m| m.is_file()).map(|m| m.len())
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.metadata()?.modified().ok().map(to_utc)
    }

    fn creation(&self) -> Option<DateTime<Utc>> {
        let meta = self.metadata()?;
        meta.created().or_else(|_| meta.modified()).ok().map(to_utc)
    }

    fn canonical_path(&self) -> Option<PathBuf> {
        self.file.canonicalize().ok()
    }

    fn content(&self) -> ResourceResult<Option<Arc<[u8]>>> {
        if !self.is_file() {
            return Ok(None);
        }
        Ok(Some(Arc::from(fs::read(&self.file)?)))
    }

    fn open(&self) -> ResourceResult<Option<ResourceStream>> {
        if !self.is_file() {
            return Ok(None);
        }
        let file = File::open(&self.file)?;
        Ok(Some(Box::new(BufReader::new(file))))
    }

    fn delete(&self) -> bool {
        if self.read_only {
            return false;
        }
        let removed = if self.is_directory() {
            fs::remove_dir(&self.file)
        } else {
            fs::remove_file(&self.file)
        };
        removed.is_ok()
    }
}
