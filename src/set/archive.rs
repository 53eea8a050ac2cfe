//! Archive-backed resource sets.
//!
//! ```text
//! get_resource("/css/site.css")
//!   │
//!   ├─► MountPoint::translate ──► "css/site.css"
//!   ├─► index() ── first call only ──► scan archive ──► ArchiveIndex (+ bloom)
//!   ├─► bloom.might_contain? ── no ──► EmptyResource
//!   └─► index.lookup ──► ArchiveResource { entry, opener: ArchiveSource }
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use super::{
    MountPoint, ResourceSet, SetContext, SetKind, SetOptions, unmounted_list, unmounted_resource,
    unmounted_webapp_paths,
};
use crate::archive::{ArchiveIndex, ArchiveSource};
use crate::error::{ResourceError, ResourceResult};
use crate::path::with_trailing_slash;
use crate::resource::{ArchiveResource, ArchiveRootResource, EmptyResource, EntryOpener, ResourceRef};

/// An archive, or an archive nested in another archive, mounted into the
/// webapp. Always read-only.
#[derive(Debug)]
pub struct ArchiveResourceSet {
    mount: MountPoint,
    options: SetOptions,
    source: Arc<ArchiveSource>,
    bloom: AtomicBool,
    index: RwLock<Option<Arc<ArchiveIndex>>>,
}

impl ArchiveResourceSet {
    /// Mount the archive file `archive`.
    pub fn new(mount: MountPoint, archive: impl Into<PathBuf>, options: SetOptions) -> ResourceResult<Self> {
        let archive = archive.into();
        if !archive.is_file() {
            return Err(ResourceError::InvalidBase {
                kind: SetKind::Archive.as_str(),
                path: archive,
            });
        }
        Ok(Self::with_source(mount, ArchiveSource::file(archive), options))
    }

    /// Mount the archive stored at `entry` inside the archive file `outer`.
    ///
    /// The inner archive is never extracted to disk.
    pub fn nested(
        mount: MountPoint,
        outer: impl Into<PathBuf>,
        entry: &str,
        options: SetOptions,
    ) -> ResourceResult<Self> {
        let outer = outer.into();
        if !outer.is_file() {
            return Err(ResourceError::InvalidBase {
                kind: SetKind::NestedArchive.as_str(),
                path: outer,
            });
        }
        Ok(Self::with_source(mount, ArchiveSource::nested(outer, entry), options))
    }

    fn with_source(mount: MountPoint, source: ArchiveSource, options: SetOptions) -> Self {
        Self {
            mount,
            options: SetOptions {
                read_only: true,
                ..options
            },
            source: Arc::new(source),
            bloom: AtomicBool::new(false),
            index: RwLock::new(None),
        }
    }

    /// Where the archive lives.
    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    /// The entry index, built on first use.
    pub fn index(&self) -> ResourceResult<Arc<ArchiveIndex>> {
        if let Some(index) = self.index.read().as_ref() {
            return Ok(Arc::clone(index));
        }

        let mut slot = self.index.write();
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }

        let scanned = self.source.scan()?;
        let index = Arc::new(ArchiveIndex::build(
            scanned,
            self.source.modified(),
            self.bloom.load(Ordering::Relaxed),
        ));
        tracing::debug!(
            archive = %self.source.location().display(),
            entries = index.len(),
            bloom = index.bloom().is_some(),
            "indexed archive"
        );
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Archive-relative entry name for a mounted path.
    fn entry_name(&self, path: &str) -> Option<String> {
        let relative = self.mount.translate(path)?;
        Some(relative.trim_start_matches('/').to_string())
    }
}

impl ResourceSet for ArchiveResourceSet {
    fn kind(&self) -> SetKind {
        match *self.source {
            ArchiveSource::File(_) => SetKind::Archive,
            ArchiveSource::Nested { .. } => SetKind::NestedArchive,
        }
    }

    fn mount(&self) -> &MountPoint {
        &self.mount
    }

    fn options(&self) -> &SetOptions {
        &self.options
    }

    fn get_resource(&self, path: &str) -> ResourceResult<ResourceRef> {
        let Some(name) = self.entry_name(path) else {
            return Ok(unmounted_resource(&self.mount, path));
        };
        if name.is_empty() {
            return Ok(Arc::new(ArchiveRootResource::new(
                with_trailing_slash(path),
                self.source.location(),
                self.source.modified(),
            )));
        }

        let index = self.index()?;
        if let Some(bloom) = index.bloom()
            && !bloom.might_contain(&name, "")
        {
            return Ok(Arc::new(EmptyResource::new(path)));
        }

        match index.lookup(&name) {
            Some(entry) => {
                let webapp_path = if entry.is_dir {
                    with_trailing_slash(path)
                } else {
                    path.to_string()
                };
                let opener: Arc<dyn EntryOpener> = self.source.clone();
                Ok(Arc::new(ArchiveResource::new(webapp_path, entry.clone(), opener)))
            }
            None => Ok(Arc::new(EmptyResource::new(path))),
        }
    }

    fn list(&self, path: &str) -> ResourceResult<Vec<String>> {
        let Some(name) = self.entry_name(path) else {
            return Ok(unmounted_list(&self.mount, path));
        };
        let prefix = if name.is_empty() { name } else { with_trailing_slash(&name) };
        Ok(self
            .index()?
            .children(&prefix)
            .into_iter()
            .map(|(child, _)| child.to_string())
            .collect())
    }

    fn list_webapp_paths(&self, path: &str) -> ResourceResult<FxHashSet<String>> {
        let Some(name) = self.entry_name(path) else {
            return Ok(unmounted_webapp_paths(&self.mount, path));
        };
        let prefix = if name.is_empty() { name } else { with_trailing_slash(&name) };
        let base = with_trailing_slash(path);
        Ok(self
            .index()?
            .children(&prefix)
            .into_iter()
            .map(|(child, is_dir)| {
                if is_dir {
                    format!("{base}{child}/")
                } else {
                    format!("{base}{child}")
                }
            })
            .collect())
    }

    fn mkdir(&self, _path: &str) -> ResourceResult<bool> {
        Ok(false)
    }

    fn write(&self, _path: &str, _data: &mut dyn Read, _overwrite: bool) -> ResourceResult<bool> {
        Ok(false)
    }

    fn start(&self, ctx: &SetContext) -> ResourceResult<()> {
        self.bloom.store(ctx.archive_bloom, Ordering::Relaxed);
        tracing::debug!(
            kind = %self.kind(),
            mount = self.mount.webapp_path(),
            archive = %self.source.location().display(),
            "started archive set"
        );
        Ok(())
    }

    fn stop(&self) {
        *self.index.write() = None;
        tracing::debug!(mount = self.mount.webapp_path(), "stopped archive set");
    }
}
