//! Resource views over files, directories and archive entries.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     WebResource variants                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  FileResource         file or directory on disk (live stat)  │
//! │  ArchiveResource      entry snapshot + EntryOpener locator   │
//! │  ArchiveRootResource  synthetic directory at an archive root │
//! │  EmptyResource        not found (the sentinel value)         │
//! │  VirtualResource      directory implied by a mount point     │
//! │  CachedResource       cache wrapper (see `crate::cache`)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups never fail just because nothing is there: they hand back an
//! [`EmptyResource`] whose [`exists`](WebResource::exists) is `false`.

mod archive;
mod empty;
mod file;

pub use archive::{ArchiveResource, ArchiveRootResource, EntryOpener};
pub use empty::{EmptyResource, VirtualResource};
pub use file::FileResource;

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::cache::SlotCell;
use crate::error::ResourceResult;
use crate::path::last_segment;

/// Shared handle to a resource.
pub type ResourceRef = Arc<dyn WebResource>;

/// Boxed content stream.
pub type ResourceStream = Box<dyn Read + Send>;

// =============================================================================
// ResourceAttrs - state common to every variant
// =============================================================================

/// Identity and lazily derived attributes shared by all resource variants.
#[derive(Debug)]
pub struct ResourceAttrs {
    webapp_path: String,
    name: String,
    mime_type: RwLock<Option<String>>,
    etag: SlotCell<Option<String>>,
}

impl ResourceAttrs {
    /// Attributes for `webapp_path`, naming the resource after its last segment.
    pub fn new(webapp_path: impl Into<String>) -> Self {
        let webapp_path = webapp_path.into();
        let name = last_segment(&webapp_path).to_string();
        Self::with_name(webapp_path, name)
    }

    /// Attributes with an explicit name.
    pub fn with_name(webapp_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            webapp_path: webapp_path.into(),
            name: name.into(),
            mime_type: RwLock::new(None),
            etag: SlotCell::new(),
        }
    }
}

// =============================================================================
// WebResource Trait
// =============================================================================

/// One file, directory or archive entry as seen by the web application.
///
/// `is_directory` and `is_file` are mutually exclusive for existing
/// resources. Content lengths are `None` when unknown (directories and
/// missing resources).
pub trait WebResource: Send + Sync + fmt::Debug {
    /// Identity and lazily derived attributes.
    fn attrs(&self) -> &ResourceAttrs;

    /// Whether the resource exists.
    fn exists(&self) -> bool;

    /// Whether the resource is a directory.
    fn is_directory(&self) -> bool;

    /// Whether the resource is a regular file.
    fn is_file(&self) -> bool;

    /// Content length in bytes, `None` if unknown.
    fn content_length(&self) -> Option<u64>;

    /// Last modification time.
    fn last_modified(&self) -> Option<DateTime<Utc>>;

    /// Full content, `None` for directories and missing resources.
    fn content(&self) -> ResourceResult<Option<Arc<[u8]>>>;

    /// Open a content stream, `None` for directories and missing resources.
    fn open(&self) -> ResourceResult<Option<ResourceStream>>;

    /// Webapp path this resource answers for.
    fn webapp_path(&self) -> &str {
        &self.attrs().webapp_path
    }

    /// Last path segment.
    fn name(&self) -> &str {
        &self.attrs().name
    }

    /// Whether this is a directory implied by a mount point rather than real content.
    fn is_virtual(&self) -> bool {
        false
    }

    /// Creation time, falling back to the last modification time.
    fn creation(&self) -> Option<DateTime<Utc>> {
        self.last_modified()
    }

    /// Last modification time formatted as an HTTP date.
    fn last_modified_http(&self) -> Option<String> {
        self.last_modified().map(http_date)
    }

    /// Canonical filesystem location, if the resource has one.
    fn canonical_path(&self) -> Option<PathBuf> {
        None
    }

    /// Weak entity tag derived from length and modification time.
    fn etag(&self) -> Option<String> {
        self.attrs()
            .etag
            .get_or_init(|| weak_etag(self.content_length(), self.last_modified()))
    }

    /// MIME type, if one was set.
    fn mime_type(&self) -> Option<String> {
        self.attrs().mime_type.read().clone()
    }

    /// Set the MIME type.
    fn set_mime_type(&self, mime_type: &str) {
        *self.attrs().mime_type.write() = Some(mime_type.to_string());
    }

    /// Delete the backing file or directory. Returns `false` when not permitted.
    fn delete(&self) -> bool {
        false
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Build a weak ETag `W/"<length>-<millis>"`, `-1` marking unknown parts.
pub fn weak_etag(length: Option<u64>, modified: Option<DateTime<Utc>>) -> Option<String> {
    if length.is_none() && modified.is_none() {
        return None;
    }
    let length = length.map_or(-1, |l| l as i64);
    let millis = modified.map_or(-1, |t| t.timestamp_millis());
    Some(format!("W/\"{length}-{millis}\""))
}

/// Format a timestamp as an RFC 7231 HTTP date.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[inline]
pub(crate) fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
