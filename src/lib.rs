//! # webapp-resources
//!
//! A layered resource root for web applications. Directories, single files,
//! archives and archives nested inside archives are mounted into one webapp
//! namespace and resolved in a fixed precedence order, with a bounded,
//! TTL-validated cache in front.
//!
//! ## Quick Start
//!
//! ```ignore
//! use webapp_resources::prelude::*;
//!
//! let root = ResourceRoot::builder()
//!     .main_base("webapp")?
//!     .cache_ttl_ms(5_000)
//!     .build()?;
//! root.start()?;
//!
//! let index = root.get_resource("/index.html")?;
//! if index.exists() {
//!     let bytes = index.content()?;
//! }
//!
//! // Call periodically from the host's scheduler
//! root.background_process();
//! ```
//!
//! ## Lookup Order
//!
//! | Group         | Typical content                         |
//! |---------------|-----------------------------------------|
//! | pre           | overlays that win over the application  |
//! | main          | the document base (exactly one)         |
//! | contributed   | `META-INF/resources` of library archives |
//! | post          | fallbacks                               |
//!
//! The first set with an existing resource wins. Missing resources are
//! values, not errors: check [`WebResource::exists`].
//!
//! ## Modules
//!
//! - [`root`]: [`ResourceRoot`] facade, [`RootBuilder`], [`SetStack`]
//! - [`set`]: resource set backends and [`MountPoint`] translation
//! - [`resource`]: the [`WebResource`] trait and its variants
//! - [`cache`]: [`Cache`], [`CachedResource`], [`SlotCell`]
//! - [`archive`]: archive reading, indexing and [`ArchiveBloom`]
//! - [`config`]: JSON configuration and [`ConfigBuilder`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod cache;
pub mod config;
pub mod error;
pub mod lookup;
pub mod path;
pub mod resource;
pub mod root;
pub mod set;

#[cfg(test)]
mod testing;

// =============================================================================
// Prelude - import commonly used items with a single `use`
// =============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use webapp_resources::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Config, ConfigBuilder, LookupKind, MountDef, MountKind, ResourceError, ResourceResult,
        ResourceRoot, RootBuilder, SetGroup, WebResource,
    };
    pub use crate::set::{
        ArchiveResourceSet, DirResourceSet, EmptyResourceSet, FileResourceSet, MountPoint,
        SetOptions,
    };
}

// =============================================================================
// Root
// =============================================================================

pub use root::{CLASSES_PATH, ResourceRoot, RootBuilder, SetStack};

// =============================================================================
// Resources and Sets
// =============================================================================

pub use resource::{ResourceRef, ResourceStream, WebResource};
pub use set::{MountPoint, ResourceSet, SetContext, SetKind, SetOptions, SetRef};

// =============================================================================
// Infrastructure
// =============================================================================

pub use archive::ArchiveBloom;
pub use cache::{Cache, CacheStrategy, CachedResource, SlotCell};
pub use config::{Config, ConfigBuilder, MountDef, MountKind, SetGroup};
pub use error::{ResourceError, ResourceResult};
pub use lookup::{LookupKind, ResourceLookup};
