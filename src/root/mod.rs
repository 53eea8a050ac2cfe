//! The resource root: one ordered view over all mounted sets.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ResourceRoot                          │
//! │   validate "/"-prefix ─► normalize ─► cached? ─► Cache       │
//! │                                          │         │         │
//! │                                          └─────────┤         │
//! │                                                    ▼         │
//! │  SetStack:  pre ─► main ─► contributed ─► post               │
//! │             first existing wins, else virtual dir, else main │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations go to the main set only, and only when no pre set already
//! provides the path.

mod builder;
mod stack;

pub use builder::RootBuilder;
pub use stack::SetStack;

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashSet;

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{ResourceError, ResourceResult};
use crate::lookup::{LookupKind, ResourceLookup};
use crate::path::normalize;
use crate::resource::{EmptyResource, ResourceRef};
use crate::set::{SetContext, SetRef};

/// Prefix added to class-loader lookups.
pub const CLASSES_PATH: &str = "/WEB-INF/classes";

/// Layered, optionally cached view of a web application's resources.
#[derive(Debug)]
pub struct ResourceRoot {
    stack: Arc<SetStack>,
    cache: Cache,
    context: SetContext,
    caching_allowed: AtomicBool,
    started: AtomicBool,
}

impl ResourceRoot {
    fn new(
        pre: Vec<SetRef>,
        main: SetRef,
        contributed: Vec<SetRef>,
        post: Vec<SetRef>,
        context: SetContext,
    ) -> Self {
        let stack = Arc::new(SetStack::new(pre, main, contributed, post));
        let cache = Cache::new(Arc::clone(&stack) as Arc<dyn ResourceLookup>);
        Self {
            stack,
            cache,
            context,
            caching_allowed: AtomicBool::new(true),
            started: AtomicBool::new(false),
        }
    }

    /// Start building a root.
    pub fn builder() -> RootBuilder {
        RootBuilder::new()
    }

    /// Build a root from configuration. It still has to be started.
    pub fn from_config(config: &Config) -> ResourceResult<Self> {
        RootBuilder::from_config(config)?.build()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start every set. Lookups fail with [`ResourceError::NotStarted`] before this.
    pub fn start(&self) -> ResourceResult<()> {
        self.stack.start(&self.context)?;
        self.started.store(true, Ordering::Release);
        tracing::debug!(
            sets = self.stack.len(),
            caching = self.is_caching_allowed(),
            packed = self.is_packed_archive(),
            "resource root started"
        );
        Ok(())
    }

    /// Stop every set and empty the cache.
    pub fn stop(&self) {
        self.started.store(false, Ordering::Release);
        self.stack.stop();
        self.cache.clear();
        tracing::debug!("resource root stopped");
    }

    /// Whether the root is started.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The set groups.
    pub fn stack(&self) -> &SetStack {
        &self.stack
    }

    /// The cache, for limits and statistics.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Whether lookups go through the cache.
    pub fn is_caching_allowed(&self) -> bool {
        self.caching_allowed.load(Ordering::Relaxed)
    }

    /// Turn the cache on or off. Turning it off empties it.
    pub fn set_caching_allowed(&self, allowed: bool) {
        self.caching_allowed.store(allowed, Ordering::Relaxed);
        if !allowed {
            self.cache.clear();
        }
    }

    /// Whether the main set is a packed archive with no overlays. Cached
    /// entries are then never revalidated.
    pub fn is_packed_archive(&self) -> bool {
        self.stack.is_packed_archive()
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Resolve `path`. Never fails for a missing resource; check
    /// [`exists`](crate::resource::WebResource::exists).
    pub fn get_resource(&self, path: &str) -> ResourceResult<ResourceRef> {
        self.lookup(path, LookupKind::Static)
    }

    /// Resolve `path` below `/WEB-INF/classes` as a class-loader lookup.
    pub fn get_class_loader_resource(&self, path: &str) -> ResourceResult<ResourceRef> {
        check_absolute(path)?;
        self.lookup(&format!("{CLASSES_PATH}{path}"), LookupKind::ClassLoader)
    }

    /// Every existing match for `path` in precedence order. Never empty.
    pub fn get_resources(&self, path: &str) -> ResourceResult<Vec<ResourceRef>> {
        let Some(normalized) = self.prepare(path)? else {
            let missing: ResourceRef = Arc::new(EmptyResource::new(path));
            return Ok(vec![missing]);
        };
        self.stack.resolve_all(&normalized, LookupKind::Static)
    }

    /// Names of the children of directory `path` across all sets.
    pub fn list(&self, path: &str) -> ResourceResult<Vec<String>> {
        match self.prepare(path)? {
            Some(path) => self.stack.list(&path),
            None => Ok(Vec::new()),
        }
    }

    /// Webapp paths of the children of `path` across all sets.
    /// Directories end with `/`.
    pub fn list_webapp_paths(&self, path: &str) -> ResourceResult<FxHashSet<String>> {
        match self.prepare(path)? {
            Some(path) => self.stack.list_webapp_paths(&path),
            None => Ok(FxHashSet::default()),
        }
    }

    fn lookup(&self, path: &str, kind: LookupKind) -> ResourceResult<ResourceRef> {
        let Some(normalized) = self.prepare(path)? else {
            return Ok(Arc::new(EmptyResource::new(path)));
        };
        if self.is_caching_allowed() {
            self.cache.get_resource(&normalized, kind)
        } else {
            self.stack.resolve(&normalized, kind)
        }
    }

    /// Check state and path; `None` when the path climbs above the root.
    fn prepare(&self, path: &str) -> ResourceResult<Option<String>> {
        if !self.is_started() {
            return Err(ResourceError::NotStarted);
        }
        check_absolute(path)?;
        Ok(normalize(path))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Create directory `path` in the main set.
    pub fn mkdir(&self, path: &str) -> ResourceResult<bool> {
        let Some(path) = self.prepare(path)? else {
            return Ok(false);
        };
        let created = self.stack.mkdir(&path)?;
        if created {
            self.cache.remove(&path);
        }
        Ok(created)
    }

    /// Write `data` to `path` in the main set.
    pub fn write(&self, path: &str, data: &mut dyn Read, overwrite: bool) -> ResourceResult<bool> {
        let Some(path) = self.prepare(path)? else {
            return Ok(false);
        };
        let written = self.stack.write(&path, data, overwrite)?;
        if written {
            self.cache.remove(&path);
        }
        Ok(written)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Periodic maintenance hook: background cache eviction.
    pub fn background_process(&self) {
        if self.is_started() && self.is_caching_allowed() {
            self.cache.background_process();
        }
    }
}

fn check_absolute(path: &str) -> ResourceResult<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(ResourceError::invalid_path(path))
    }
}
