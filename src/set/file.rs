//! Single-file resource set.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::{MountPoint, ResourceSet, SetContext, SetKind, SetOptions, unmounted_list, unmounted_resource};
use crate::error::{ResourceError, ResourceResult};
use crate::path::with_trailing_slash;
use crate::resource::{EmptyResource, FileResource, ResourceRef};

/// One file on disk exposed at exactly its mount path.
///
/// Typically used to overlay a single file such as `/WEB-INF/web.xml`.
/// Never writable.
#[derive(Debug)]
pub struct FileResourceSet {
    mount: MountPoint,
    options: SetOptions,
    file: PathBuf,
}

impl FileResourceSet {
    /// Expose `file` at `mount`'s webapp path.
    pub fn new(mount: MountPoint, file: impl Into<PathBuf>, options: SetOptions) -> ResourceResult<Self> {
        let file = file.into();
        if !file.is_file() || mount.webapp_path() == "/" {
            return Err(ResourceError::InvalidBase {
                kind: SetKind::File.as_str(),
                path: file,
            });
        }
        Ok(Self {
            mount,
            options: SetOptions {
                read_only: true,
                ..options
            },
            file,
        })
    }

    /// The backing file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn is_target(&self, path: &str) -> bool {
        path == self.mount.webapp_path()
    }
}

impl ResourceSet for FileResourceSet {
    fn kind(&self) -> SetKind {
        SetKind::File
    }

    fn mount(&self) -> &MountPoint {
        &self.mount
    }

    fn options(&self) -> &SetOptions {
        &self.options
    }

    fn get_resource(&self, path: &str) -> ResourceResult<ResourceRef> {
        if self.is_target(path) {
            return Ok(Arc::new(FileResource::new(path, &self.file, true)));
        }
        if self.mount.is_mounted(path) {
            return Ok(Arc::new(EmptyResource::new(path)));
        }
        Ok(unmounted_resource(&self.mount, path))
    }

    fn list(&self, path: &str) -> ResourceResult<Vec<String>> {
        Ok(unmounted_list(&self.mount, path))
    }

    fn list_webapp_paths(&self, path: &str) -> ResourceResult<FxHashSet<String>> {
        let mut paths = FxHashSet::default();
        if let Some(segment) = self.mount.next_segment(path) {
            let child = format!("{}{segment}", with_trailing_slash(path));
            if child == self.mount.webapp_path() {
                paths.insert(child);
            } else {
                paths.insert(child + "/");
            }
        }
        Ok(paths)
    }

    fn mkdir(&self, _path: &str) -> ResourceResult<bool> {
        Ok(false)
    }

    fn write(&self, _path: &str, _data: &mut dyn Read, _overwrite: bool) -> ResourceResult<bool> {
        Ok(false)
    }

    fn start(&self, _ctx: &SetContext) -> ResourceResult<()> {
        tracing::debug!(
            mount = self.mount.webapp_path(),
            file = %self.file.display(),
            "started file set"
        );
        Ok(())
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn web_xml(dir: &TempDir) -> FileResourceSet {
        let file = dir.path().join("web.xml");
        fs::write(&file, "<web-app/>").unwrap();
        FileResourceSet::new(
            MountPoint::new("/WEB-INF/web.xml", ""),
            file,
            SetOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_file_exposed_at_mount_only() {
        let dir = TempDir::new().unwrap();
        let set = web_xml(&dir);

        let res = set.get_resource("/WEB-INF/web.xml").unwrap();
        assert!(res.exists());
        assert!(res.is_file());
        assert_eq!(res.content_length(), Some(10));

        assert!(!set.get_resource("/WEB-INF/web.xml/x").unwrap().exists());
        assert!(!set.get_resource("/index.html").unwrap().exists());
    }

    #[test]
    fn test_ancestors_are_virtual() {
        let dir = TempDir::new().unwrap();
        let set = web_xml(&dir);

        let parent = set.get_resource("/WEB-INF").unwrap();
        assert!(parent.is_virtual());
        assert_eq!(set.list("/WEB-INF").unwrap(), vec!["web.xml"]);
        let paths = set.list_webapp_paths("/WEB-INF/").unwrap();
        assert!(paths.contains("/WEB-INF/web.xml"));
        assert!(set.list_webapp_paths("/").unwrap().contains("/WEB-INF/"));
    }

    #[test]
    fn test_never_writable() {
        let dir = TempDir::new().unwrap();
        let set = web_xml(&dir);
        assert!(set.is_read_only());
        assert!(!set.mkdir("/WEB-INF/x").unwrap());
        assert!(!set.write("/WEB-INF/web.xml", &mut &b"x"[..], true).unwrap());
        assert!(!set.get_resource("/WEB-INF/web.xml").unwrap().delete());
    }
}
