//! One cached resource.
//!
//! ```text
//! CachedResource
//! ├── resource        SlotCell<ResourceRef>   set once by populate()
//! ├── exists, length, last_modified           captured at populate
//! ├── is_directory, is_file, creation, ...    captured on first read
//! ├── content         only when length <= object cap
//! └── next_check      millis; no I/O before it is due
//! ```
//!
//! An entry is never updated in place after a detected change. Validation
//! fails instead, and the cache replaces the whole entry.

use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Weak};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{CacheShared, ENTRY_OVERHEAD, SlotCell};
use crate::error::ResourceResult;
use crate::lookup::{LookupKind, ResourceLookup};
use crate::resource::{ResourceAttrs, ResourceRef, ResourceStream, WebResource};

static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Milliseconds on the cache's monotonic clock.
#[inline]
pub(crate) fn now_millis() -> u64 {
    EPOCH.elapsed().as_millis() as u64
}

/// A resource snapshot held by the cache.
pub struct CachedResource {
    attrs: ResourceAttrs,
    path: String,
    kind: LookupKind,
    ttl_ms: u64,
    object_max_size: u64,
    cache: Weak<CacheShared>,
    backend: Arc<dyn ResourceLookup>,

    resource: SlotCell<ResourceRef>,
    populate_lock: Mutex<()>,
    next_check: AtomicU64,
    accounted: AtomicU64,

    exists: SlotCell<bool>,
    is_directory: SlotCell<bool>,
    is_file: SlotCell<bool>,
    is_virtual: SlotCell<bool>,
    content_length: SlotCell<Option<u64>>,
    last_modified: SlotCell<Option<DateTime<Utc>>>,
    last_modified_http: SlotCell<Option<String>>,
    creation: SlotCell<Option<DateTime<Utc>>>,
    canonical_path: SlotCell<Option<PathBuf>>,
    content: SlotCell<Option<Arc<[u8]>>>,
}

impl fmt::Debug for CachedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedResource")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("populated", &self.is_populated())
            .field("next_check", &self.next_check())
            .field("accounted", &self.accounted.load(Ordering::Relaxed))
            .finish()
    }
}

impl CachedResource {
    pub(crate) fn new(
        cache: Weak<CacheShared>,
        backend: Arc<dyn ResourceLookup>,
        path: &str,
        kind: LookupKind,
        ttl_ms: u64,
        object_max_size: u64,
    ) -> Self {
        Self {
            attrs: ResourceAttrs::new(path),
            path: path.to_string(),
            kind,
            ttl_ms,
            object_max_size,
            cache,
            backend,
            resource: SlotCell::new(),
            populate_lock: Mutex::new(()),
            next_check: AtomicU64::new(0),
            accounted: AtomicU64::new(0),
            exists: SlotCell::new(),
            is_directory: SlotCell::new(),
            is_file: SlotCell::new(),
            is_virtual: SlotCell::new(),
            content_length: SlotCell::new(),
            last_modified: SlotCell::new(),
            last_modified_http: SlotCell::new(),
            creation: SlotCell::new(),
            canonical_path: SlotCell::new(),
            content: SlotCell::new(),
        }
    }

    /// Cache key.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lookup kind this entry was populated with.
    pub fn kind(&self) -> LookupKind {
        self.kind
    }

    /// Whether the underlying resource has been resolved.
    #[inline]
    pub fn is_populated(&self) -> bool {
        self.resource.is_computed()
    }

    /// Clock millis at which the next revalidation is due.
    #[inline]
    pub fn next_check(&self) -> u64 {
        self.next_check.load(Ordering::Acquire)
    }

    /// Whether the entry is past its TTL (or was never populated).
    #[inline]
    pub(crate) fn is_due(&self, now: u64) -> bool {
        self.next_check() <= now
    }

    /// Approximate bytes this entry accounts for.
    pub fn size(&self) -> u64 {
        let length = self.content_length.get().flatten().unwrap_or(0);
        ENTRY_OVERHEAD + length.min(self.object_max_size)
    }

    pub(crate) fn add_accounted(&self, bytes: u64) {
        self.accounted.fetch_add(bytes, Ordering::AcqRel);
    }

    /// Hand back what this entry added to the cache total. Second calls return 0.
    pub(crate) fn take_accounted(&self) -> u64 {
        self.accounted.swap(0, Ordering::AcqRel)
    }

    /// Check the entry is still usable for a lookup of `kind`.
    ///
    /// Populates on first use. Before `next_check` no I/O happens. After it,
    /// the path is resolved again and compared with the snapshot.
    pub fn validate(&self, kind: LookupKind) -> ResourceResult<bool> {
        if kind != self.kind {
            return Ok(false);
        }

        if !self.is_populated() {
            let _guard = self.populate_lock.lock();
            if !self.is_populated() {
                self.populate()?;
            }
            return Ok(true);
        }

        let now = now_millis();
        if now < self.next_check() {
            return Ok(true);
        }

        if !self.backend.is_immutable() && !self.matches_backend()? {
            return Ok(false);
        }
        self.next_check.store(now + self.ttl_ms, Ordering::Release);
        Ok(true)
    }

    fn populate(&self) -> ResourceResult<()> {
        let resource = self.backend.lookup(&self.path, self.kind)?;
        self.exists.set(resource.exists());
        self.content_length.set(resource.content_length());
        self.last_modified.set(resource.last_modified());
        self.next_check
            .store(now_millis() + self.ttl_ms, Ordering::Release);
        self.resource.set(resource);
        Ok(())
    }

    fn matches_backend(&self) -> ResourceResult<bool> {
        let Some(held) = self.resource.get() else {
            return Ok(false);
        };
        let fresh = self.backend.lookup(&self.path, self.kind)?;

        let length = self.content_length();
        let modified = self.last_modified();
        Ok(held.exists() == fresh.exists()
            && held.content_length() == length
            && held.last_modified() == modified
            && fresh.content_length() == length
            && fresh.last_modified() == modified
            && held.name() == fresh.name())
    }

    fn field<T: Clone>(&self, slot: &SlotCell<T>, read: impl FnOnce(&dyn WebResource) -> T) -> Option<T> {
        if let Some(value) = slot.get() {
            return Some(value);
        }
        let resource = self.resource.get()?;
        Some(slot.set(read(resource.as_ref())))
    }

    fn fits(&self) -> bool {
        self.content_length()
            .is_some_and(|length| length <= self.object_max_size)
    }
}

impl WebResource for CachedResource {
    fn attrs(&self) -> &ResourceAttrs {
        &self.attrs
    }

    fn exists(&self) -> bool {
        self.field(&self.exists, |r| r.exists()).unwrap_or(false)
    }

    fn is_directory(&self) -> bool {
        self.field(&self.is_directory, |r| r.is_directory())
            .unwrap_or(false)
    }

    fn is_file(&self) -> bool {
        self.field(&self.is_file, |r| r.is_file()).unwrap_or(false)
    }

    fn is_virtual(&self) -> bool {
        self.field(&self.is_virtual, |r| r.is_virtual())
            .unwrap_or(false)
    }

    fn content_length(&self) -> Option<u64> {
        self.field(&self.content_length, |r| r.content_length())
            .flatten()
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.field(&self.last_modified, |r| r.last_modified())
            .flatten()
    }

    fn last_modified_http(&self) -> Option<String> {
        self.field(&self.last_modified_http, |r| r.last_modified_http())
            .flatten()
    }

    fn creation(&self) -> Option<DateTime<Utc>> {
        self.field(&self.creation, |r| r.creation()).flatten()
    }

    fn canonical_path(&self) -> Option<PathBuf> {
        self.field(&self.canonical_path, |r| r.canonical_path())
            .flatten()
    }

    fn content(&self) -> ResourceResult<Option<Arc<[u8]>>> {
        let Some(resource) = self.resource.get() else {
            return Ok(None);
        };
        if !self.fits() {
            return Ok(None);
        }
        if let Some(cached) = self.content.get() {
            return Ok(cached);
        }

        // The file may have changed since populate; only keep bytes that
        // still match the accounted length.
        let Some(bytes) = resource.content()? else {
            return Ok(None);
        };
        let length = bytes.len() as u64;
        if length > self.object_max_size || Some(length) != self.content_length() {
            return Ok(None);
        }
        Ok(self.content.set(Some(bytes)))
    }

    fn open(&self) -> ResourceResult<Option<ResourceStream>> {
        let Some(resource) = self.resource.get() else {
            return Ok(None);
        };
        if self.is_file()
            && self.fits()
            && let Some(bytes) = self.content()?
        {
            return Ok(Some(Box::new(Cursor::new(bytes))));
        }
        resource.open()
    }

    fn mime_type(&self) -> Option<String> {
        self.resource.get().and_then(|r| r.mime_type())
    }

    fn set_mime_type(&self, mime_type: &str) {
        if let Some(resource) = self.resource.get() {
            resource.set_mime_type(mime_type);
        }
    }

    fn delete(&self) -> bool {
        let Some(resource) = self.resource.get() else {
            return false;
        };
        let deleted = resource.delete();
        if deleted && let Some(cache) = self.cache.upgrade() {
            cache.remove_entry(&self.path, self);
        }
        deleted
    }
}
