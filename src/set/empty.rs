//! Placeholder set that never finds anything.

use std::io::Read;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::{MountPoint, ResourceSet, SetContext, SetKind, SetOptions};
use crate::error::ResourceResult;
use crate::resource::{EmptyResource, ResourceRef};

/// Empty set, used as the main set when an application has no document base.
#[derive(Debug)]
pub struct EmptyResourceSet {
    mount: MountPoint,
    options: SetOptions,
}

impl EmptyResourceSet {
    /// Create an empty set mounted at the root.
    pub fn new() -> Self {
        Self {
            mount: MountPoint::root(),
            options: SetOptions::read_only(),
        }
    }
}

impl Default for EmptyResourceSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSet for EmptyResourceSet {
    fn kind(&self) -> SetKind {
        SetKind::Empty
    }

    fn mount(&self) -> &MountPoint {
        &self.mount
    }

    fn options(&self) -> &SetOptions {
        &self.options
    }

    fn get_resource(&self, path: &str) -> ResourceResult<ResourceRef> {
        Ok(Arc::new(EmptyResource::new(path)))
    }

    fn list(&self, _path: &str) -> ResourceResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn list_webapp_paths(&self, _path: &str) -> ResourceResult<FxHashSet<String>> {
        Ok(FxHashSet::default())
    }

    fn mkdir(&self, _path: &str) -> ResourceResult<bool> {
        Ok(false)
    }

    fn write(&self, _path: &str, _data: &mut dyn Read, _overwrite: bool) -> ResourceResult<bool> {
        Ok(false)
    }

    fn start(&self, _ctx: &SetContext) -> ResourceResult<()> {
        Ok(())
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_finds_nothing() {
        let set = EmptyResourceSet::new();
        assert!(!set.get_resource("/").unwrap().exists());
        assert!(!set.get_resource("/index.html").unwrap().exists());
        assert!(set.list("/").unwrap().is_empty());
        assert!(!set.mkdir("/a").unwrap());
        assert!(set.is_read_only());
    }
}
