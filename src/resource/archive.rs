//! Archive entries and archive roots.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{ResourceAttrs, ResourceStream, WebResource};
use crate::archive::EntryMeta;
use crate::error::ResourceResult;

/// Opens entry content on demand.
///
/// Archive resources keep only a locator, never an open handle; content is
/// read through this trait and the handle is dropped before returning.
pub trait EntryOpener: Send + Sync + std::fmt::Debug {
    /// Open the entry `name` for reading.
    fn open_entry(&self, name: &str) -> ResourceResult<ResourceStream>;

    /// Archive file on disk that holds the entry.
    fn location(&self) -> &Path;
}

/// One entry of a mounted archive.
///
/// Metadata is a snapshot taken when the archive was indexed. Archive-backed
/// resources are always read-only.
#[derive(Debug)]
pub struct ArchiveResource {
    attrs: ResourceAttrs,
    entry: EntryMeta,
    opener: Arc<dyn EntryOpener>,
}

impl ArchiveResource {
    /// Create a resource for `entry`, answering for `webapp_path`.
    pub fn new(webapp_path: impl Into<String>, entry: EntryMeta, opener: Arc<dyn EntryOpener>) -> Self {
        Self {
            attrs: ResourceAttrs::new(webapp_path),
            entry,
            opener,
        }
    }

    /// Entry name inside the archive.
    pub fn entry_name(&self) -> &str {
        &self.entry.name
    }
}

impl WebResource for ArchiveResource {
    fn attrs(&self) -> &ResourceAttrs {
        &self.attrs
    }

    fn exists(&self) -> bool {
        true
    }

    fn is_directory(&self) -> bool {
        self.entry.is_dir
    }

    fn is_file(&self) -> bool {
        !self.entry.is_dir
    }

    fn content_length(&self) -> Option<u64> {
        (!self.entry.is_dir).then_some(self.entry.size)
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.entry.modified
    }

    fn content(&self) -> ResourceResult<Option<Arc<[u8]>>> {
        let Some(mut stream) = self.open()? else {
            return Ok(None);
        };
        let mut buf = Vec::with_capacity(self.entry.size as usize);
        stream.read_to_end(&mut buf)?;
        Ok(Some(Arc::from(buf)))
    }

    fn open(&self) -> ResourceResult<Option<ResourceStream>> {
        if self.entry.is_dir {
            return Ok(None);
        }
        self.opener.open_entry(&self.entry.name).map(Some)
    }
}

/// The root directory of a mounted archive.
///
/// Archives have no entry for their own root, so this synthetic directory
/// stands in for it and borrows the archive file's modification time.
#[derive(Debug)]
pub struct ArchiveRootResource {
    attrs: ResourceAttrs,
    archive: PathBuf,
    modified: Option<DateTime<Utc>>,
}

impl ArchiveRootResource {
    /// Root of `archive`, answering for `webapp_path`.
    pub fn new(
        webapp_path: impl Into<String>,
        archive: impl Into<PathBuf>,
        modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            attrs: ResourceAttrs::new(webapp_path),
            archive: archive.into(),
            modified,
        }
    }
}

impl WebResource for ArchiveRootResource {
    fn attrs(&self) -> &ResourceAttrs {
        &self.attrs
    }

    fn exists(&self) -> bool {
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
        self.modified
    }

    fn canonical_path(&self) -> Option<PathBuf> {
        self.archive.canonicalize().ok()
    }

    fn content(&self) -> ResourceResult<Option<Arc<[u8]>>> {
        Ok(None)
    }

    fn open(&self) -> ResourceResult<Option<ResourceStream>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveSource;
    use crate::testing::write_zip;
    use tempfile::TempDir;

    #[test]
    fn test_archive_entry_resource() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("app.jar");
        write_zip(&jar, &[("css/site.css", b"body{}")]);

        let opener: Arc<dyn EntryOpener> = Arc::new(ArchiveSource::file(&jar));
        let res = ArchiveResource::new(
            "/css/site.css",
            EntryMeta::file("css/site.css", 6, None),
            opener,
        );
        assert!(res.exists());
        assert!(res.is_file());
        assert_eq!(res.content_length(), Some(6));
        assert_eq!(&*res.content().unwrap().unwrap(), b"body{}");
        assert!(!res.delete());
    }

    #[test]
    fn test_archive_directory_entry_has_no_content() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("app.jar");
        write_zip(&jar, &[("css/", b"")]);

        let opener: Arc<dyn EntryOpener> = Arc::new(ArchiveSource::file(&jar));
        let res = ArchiveResource::new("/css/", EntryMeta::dir("css/", None), opener);
        assert!(res.is_directory());
        assert_eq!(res.content_length(), None);
        assert!(res.open().unwrap().is_none());
    }

    #[test]
    fn test_archive_root_is_directory() {
        let res = ArchiveRootResource::new("/lib/", "/nowhere/app.jar", None);
        assert!(res.exists());
        assert!(res.is_directory());
        assert_eq!(res.name(), "lib");
        assert!(res.content().unwrap().is_none());
    }
}
