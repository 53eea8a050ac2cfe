//! Ordered groups of resource sets and uncached resolution over them.

use std::io::Read;
use std::iter;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::error::ResourceResult;
use crate::lookup::{LookupKind, ResourceLookup};
use crate::resource::{EmptyResource, ResourceRef};
use crate::set::{SetContext, SetRef};

/// The four set groups in lookup order: pre, main, contributed, post.
#[derive(Debug)]
pub struct SetStack {
    pre: Vec<SetRef>,
    main: SetRef,
    contributed: Vec<SetRef>,
    post: Vec<SetRef>,
}

impl SetStack {
    pub(crate) fn new(pre: Vec<SetRef>, main: SetRef, contributed: Vec<SetRef>, post: Vec<SetRef>) -> Self {
        Self {
            pre,
            main,
            contributed,
            post,
        }
    }

    /// The main set.
    pub fn main(&self) -> &SetRef {
        &self.main
    }

    /// Sets that take precedence over main.
    pub fn pre(&self) -> &[SetRef] {
        &self.pre
    }

    /// Archive sets contributed by libraries.
    pub fn contributed(&self) -> &[SetRef] {
        &self.contributed
    }

    /// Sets consulted last.
    pub fn post(&self) -> &[SetRef] {
        &self.post
    }

    /// Every set in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &SetRef> {
        self.pre
            .iter()
            .chain(iter::once(&self.main))
            .chain(&self.contributed)
            .chain(&self.post)
    }

    /// Number of sets.
    pub fn len(&self) -> usize {
        self.pre.len() + 1 + self.contributed.len() + self.post.len()
    }

    /// Always `false`: there is at least the main set.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn is_main(&self, set: &SetRef) -> bool {
        Arc::ptr_eq(set, &self.main)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start every set, in parallel with the `parallel` feature.
    pub(crate) fn start(&self, ctx: &SetContext) -> ResourceResult<()> {
        let sets: Vec<&SetRef> = self.iter().collect();

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            sets.par_iter().try_for_each(|set| set.start(ctx))
        }

        #[cfg(not(feature = "parallel"))]
        {
            sets.iter().try_for_each(|set| set.start(ctx))
        }
    }

    /// Stop every set.
    pub(crate) fn stop(&self) {
        for set in self.iter() {
            set.stop();
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// First existing match, else the first virtual directory, else main's
    /// not-found result.
    pub fn resolve(&self, path: &str, kind: LookupKind) -> ResourceResult<ResourceRef> {
        let mut virtual_dir: Option<ResourceRef> = None;
        let mut main_result: Option<ResourceRef> = None;

        for set in self.iter() {
            if !set.serves(kind) {
                continue;
            }
            let resource = set.get_resource(path)?;
            if resource.exists() {
                return Ok(resource);
            }
            if virtual_dir.is_none() && resource.is_virtual() {
                virtual_dir = Some(Arc::clone(&resource));
            }
            if self.is_main(set) {
                main_result = Some(resource);
            }
        }

        Ok(virtual_dir
            .or(main_result)
            .unwrap_or_else(|| Arc::new(EmptyResource::new(path))))
    }

    /// Every existing match in precedence order, or main's not-found result.
    pub fn resolve_all(&self, path: &str, kind: LookupKind) -> ResourceResult<Vec<ResourceRef>> {
        let mut found = Vec::new();
        let mut main_result: Option<ResourceRef> = None;

        for set in self.iter() {
            if !set.serves(kind) {
                continue;
            }
            let resource = set.get_resource(path)?;
            if resource.exists() {
                found.push(resource);
            } else if self.is_main(set) {
                main_result = Some(resource);
            }
        }

        if found.is_empty() {
            found.push(main_result.unwrap_or_else(|| Arc::new(EmptyResource::new(path))));
        }
        Ok(found)
    }

    /// Union of child names, first occurrence order.
    pub fn list(&self, path: &str) -> ResourceResult<Vec<String>> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for set in self.iter().filter(|s| s.serves(LookupKind::Static)) {
            for name in set.list(path)? {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Union of child webapp paths.
    pub fn list_webapp_paths(&self, path: &str) -> ResourceResult<FxHashSet<String>> {
        let mut paths = FxHashSet::default();
        for set in self.iter().filter(|s| s.serves(LookupKind::Static)) {
            paths.extend(set.list_webapp_paths(path)?);
        }
        Ok(paths)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Whether a pre set already has something at `path`.
    pub fn is_shadowed(&self, path: &str) -> ResourceResult<bool> {
        for set in &self.pre {
            if set.serves(LookupKind::Static) && set.get_resource(path)?.exists() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Create a directory in main unless a pre set shadows `path`.
    pub fn mkdir(&self, path: &str) -> ResourceResult<bool> {
        if self.is_shadowed(path)? {
            tracing::debug!(path, "mkdir rejected, path provided by a pre set");
            return Ok(false);
        }
        self.main.mkdir(path)
    }

    /// Write to main unless a pre set shadows `path`.
    pub fn write(&self, path: &str, data: &mut dyn Read, overwrite: bool) -> ResourceResult<bool> {
        if self.is_shadowed(path)? {
            tracing::debug!(path, "write rejected, path provided by a pre set");
            return Ok(false);
        }
        self.main.write(path, data, overwrite)
    }

    /// Whether the whole view is a single packed archive.
    pub fn is_packed_archive(&self) -> bool {
        self.main.kind().is_archive() && self.pre.is_empty() && self.post.is_empty()
    }
}

impl ResourceLookup for SetStack {
    fn lookup(&self, path: &str, kind: LookupKind) -> ResourceResult<ResourceRef> {
        self.resolve(path, kind)
    }

    fn is_immutable(&self) -> bool {
        self.is_packed_archive()
    }
}
