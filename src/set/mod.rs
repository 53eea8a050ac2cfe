//! Resource sets: storage backends mounted into the webapp namespace.
//!
//! # Architecture
//!
//! ```text
//! webapp path ──► MountPoint::translate ──► backend-relative path
//!                        │
//!     ┌──────────────────┼──────────────────┬──────────────────┐
//!     ▼                  ▼                  ▼                  ▼
//! DirResourceSet   FileResourceSet   ArchiveResourceSet   EmptyResourceSet
//! (directory)      (one file)        (archive / nested)   (placeholder)
//! ```
//!
//! A path that does not fall under a set's mount never reaches the backend.
//! If the mount lies below the requested path, the set answers with a
//! [`VirtualResource`](crate::resource::VirtualResource) so the mount's
//! ancestors show up as directories.

mod archive;
mod dir;
mod empty;
mod file;
mod mount;

pub use archive::ArchiveResourceSet;
pub use dir::DirResourceSet;
pub use empty::EmptyResourceSet;
pub use file::FileResourceSet;
pub use mount::MountPoint;

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::error::ResourceResult;
use crate::lookup::LookupKind;
use crate::path::with_trailing_slash;
use crate::resource::{EmptyResource, ResourceRef, VirtualResource};

/// Shared handle to a resource set.
pub type SetRef = Arc<dyn ResourceSet>;

/// Backend kind of a resource set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetKind {
    /// Directory on disk.
    Dir,
    /// Single file on disk.
    File,
    /// Archive file on disk.
    Archive,
    /// Archive stored inside another archive.
    NestedArchive,
    /// Placeholder that never finds anything.
    Empty,
}

impl SetKind {
    /// Short name used in errors and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::File => "file",
            Self::Archive => "archive",
            Self::NestedArchive => "nested-archive",
            Self::Empty => "empty",
        }
    }

    /// Whether content comes from an archive.
    #[inline]
    pub const fn is_archive(self) -> bool {
        matches!(self, Self::Archive | Self::NestedArchive)
    }
}

impl fmt::Display for SetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-set flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Reject `write`, `mkdir` and `delete`.
    pub read_only: bool,
    /// Only answer class-loader lookups.
    pub class_loader_only: bool,
    /// Only answer static lookups.
    pub static_only: bool,
}

impl SetOptions {
    /// Read-only options with no lookup restriction.
    pub const fn read_only() -> Self {
        Self {
            read_only: true,
            class_loader_only: false,
            static_only: false,
        }
    }

    /// Whether a set with these options answers lookups of `kind`.
    #[inline]
    pub const fn serves(&self, kind: LookupKind) -> bool {
        match kind {
            LookupKind::Static => !self.class_loader_only,
            LookupKind::ClassLoader => !self.static_only,
        }
    }
}

/// Root-wide settings handed to every set on start.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetContext {
    /// Follow symlinks out of directory sets and skip the case check.
    pub allow_linking: bool,
    /// Build a bloom pre-check for every archive index.
    pub archive_bloom: bool,
}

// =============================================================================
// ResourceSet Trait
// =============================================================================

/// One storage backend contributing resources under a mount point.
///
/// Paths passed in are normalized and `/`-prefixed. Absent resources are
/// values, not errors: `get_resource` returns an [`EmptyResource`] when
/// nothing is there.
pub trait ResourceSet: Send + Sync + fmt::Debug {
    /// Backend kind.
    fn kind(&self) -> SetKind;

    /// Where the set is mounted.
    fn mount(&self) -> &MountPoint;

    /// Per-set flags.
    fn options(&self) -> &SetOptions;

    /// Resolve `path`.
    fn get_resource(&self, path: &str) -> ResourceResult<ResourceRef>;

    /// Names of the children of directory `path`.
    fn list(&self, path: &str) -> ResourceResult<Vec<String>>;

    /// Full webapp paths of the children of `path`, directories ending in `/`.
    fn list_webapp_paths(&self, path: &str) -> ResourceResult<FxHashSet<String>>;

    /// Create directory `path`. Returns `false` if it exists or is not permitted.
    fn mkdir(&self, path: &str) -> ResourceResult<bool>;

    /// Write `data` to `path`. Returns `false` if not permitted, or if the
    /// file exists and `overwrite` is not set.
    fn write(&self, path: &str, data: &mut dyn Read, overwrite: bool) -> ResourceResult<bool>;

    /// Start the set.
    fn start(&self, ctx: &SetContext) -> ResourceResult<()>;

    /// Stop the set and release anything built since start.
    fn stop(&self);

    /// Whether mutations are rejected.
    fn is_read_only(&self) -> bool {
        self.options().read_only
    }

    /// Whether the set answers lookups of `kind`.
    fn serves(&self, kind: LookupKind) -> bool {
        self.options().serves(kind)
    }
}

// =============================================================================
// Shared helpers for paths outside a set's mount
// =============================================================================

/// Resource for a path the set is not mounted at.
pub(crate) fn unmounted_resource(mount: &MountPoint, path: &str) -> ResourceRef {
    if mount.is_below(path) {
        Arc::new(VirtualResource::new(with_trailing_slash(path)))
    } else {
        Arc::new(EmptyResource::new(path))
    }
}

/// Child names of a path the set is not mounted at.
pub(crate) fn unmounted_list(mount: &MountPoint, path: &str) -> Vec<String> {
    mount
        .next_segment(path)
        .map(|segment| vec![segment.to_string()])
        .unwrap_or_default()
}

/// Child webapp paths of a path the set is not mounted at.
pub(crate) fn unmounted_webapp_paths(mount: &MountPoint, path: &str) -> FxHashSet<String> {
    let mut paths = FxHashSet::default();
    if let Some(segment) = mount.next_segment(path) {
        paths.insert(format!("{}{segment}/", with_trailing_slash(path)));
    }
    paths
}
