//! Directory-backed resource set.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashSet;

use super::{
    MountPoint, ResourceSet, SetContext, SetKind, SetOptions, unmounted_list, unmounted_resource,
    unmounted_webapp_paths,
};
use crate::error::{ResourceError, ResourceResult};
use crate::path::{canonicalize_lenient, with_trailing_slash};
use crate::resource::{EmptyResource, FileResource, ResourceRef};

/// A directory on disk mounted into the webapp.
///
/// Unless linking is allowed, every resolved path is canonicalized and must
/// stay under the canonical base with exactly the requested name. This
/// rejects symlinks leaving the base, symlinks aliasing another name, and
/// case-insensitive matches on filesystems that fold case.
#[derive(Debug)]
pub struct DirResourceSet {
    mount: MountPoint,
    options: SetOptions,
    base: PathBuf,
    canonical_base: PathBuf,
    allow_linking: AtomicBool,
}

impl DirResourceSet {
    /// Mount directory `base` with `mount`.
    pub fn new(mount: MountPoint, base: impl Into<PathBuf>, options: SetOptions) -> ResourceResult<Self> {
        let base = base.into();
        if !base.is_dir() {
            return Err(ResourceError::InvalidBase {
                kind: SetKind::Dir.as_str(),
                path: base,
            });
        }
        let canonical_base = base.canonicalize()?;
        Ok(Self {
            mount,
            options,
            base,
            canonical_base,
            allow_linking: AtomicBool::new(false),
        })
    }

    /// The base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Map a backend-relative path to a file under the base.
    ///
    /// `None` means the path must be treated as not found.
    fn file(&self, relative: &str, must_exist: bool) -> Option<PathBuf> {
        let trimmed = relative.trim_matches('/');
        let file = if trimmed.is_empty() {
            self.base.clone()
        } else {
            self.base.join(trimmed)
        };

        if must_exist && !file.exists() {
            return None;
        }
        if relative.ends_with('/') && file.is_file() {
            return None;
        }
        if self.allow_linking.load(Ordering::Relaxed) {
            return Some(file);
        }

        let canonical = canonicalize_lenient(&file)?;
        let suffix = canonical.strip_prefix(&self.canonical_base).ok()?;
        let expected = trimmed.split('/').filter(|s| !s.is_empty()).map(OsStr::new);
        suffix
            .components()
            .map(|c| c.as_os_str())
            .eq(expected)
            .then_some(file)
    }
}

impl ResourceSet for DirResourceSet {
    fn kind(&self) -> SetKind {
        SetKind::Dir
    }

    fn mount(&self) -> &MountPoint {
        &self.mount
    }

    fn options(&self) -> &SetOptions {
        &self.options
    }

    fn get_resource(&self, path: &str) -> ResourceResult<ResourceRef> {
        let Some(relative) = self.mount.translate(path) else {
            return Ok(unmounted_resource(&self.mount, path));
        };
        let Some(file) = self.file(&relative, false) else {
            return Ok(Arc::new(EmptyResource::new(path)));
        };

        if !file.exists() {
            return Ok(Arc::new(EmptyResource::at(path, file)));
        }
        let webapp_path = if file.is_dir() {
            with_trailing_slash(path)
        } else {
            path.to_string()
        };
        Ok(Arc::new(FileResource::new(webapp_path, file, self.options.read_only)))
    }

    fn list(&self, path: &str) -> ResourceResult<Vec<String>> {
        let Some(relative) = self.mount.translate(path) else {
            return Ok(unmounted_list(&self.mount, path));
        };
        match self.file(&relative, true) {
            Some(dir) if dir.is_dir() => Ok(read_dir_sorted(&dir)?
                .into_iter()
                .map(|(name, _)| name)
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn list_webapp_paths(&self, path: &str) -> ResourceResult<FxHashSet<String>> {
        let Some(relative) = self.mount.translate(path) else {
            return Ok(unmounted_webapp_paths(&self.mount, path));
        };
        let Some(dir) = self.file(&relative, true).filter(|d| d.is_dir()) else {
            return Ok(FxHashSet::default());
        };

        let prefix = with_trailing_slash(path);
        Ok(read_dir_sorted(&dir)?
            .into_iter()
            .map(|(name, is_dir)| {
                if is_dir {
                    format!("{prefix}{name}/")
                } else {
                    format!("{prefix}{name}")
                }
            })
            .collect())
    }

    fn mkdir(&self, path: &str) -> ResourceResult<bool> {
        if self.options.read_only {
            return Ok(false);
        }
        let Some(relative) = self.mount.translate(path) else {
            return Ok(false);
        };
        let Some(dir) = self.file(&relative, false) else {
            return Ok(false);
        };
        if dir.exists() {
            return Ok(false);
        }
        Ok(fs::create_dir(&dir).is_ok())
    }

    fn write(&self, path: &str, data: &mut dyn Read, overwrite: bool) -> ResourceResult<bool> {
        if self.options.read_only || path.ends_with('/') {
            return Ok(false);
        }
        let Some(relative) = self.mount.translate(path) else {
            return Ok(false);
        };
        let Some(file) = self.file(&relative, false) else {
            return Ok(false);
        };
        if file.exists() && (!overwrite || file.is_dir()) {
            return Ok(false);
        }

        match write_file(&file, data) {
            Ok(bytes) => {
                tracing::debug!(path, bytes, "wrote resource");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(path, file = %file.display(), error = %e, "failed to write resource");
                Ok(false)
            }
        }
    }

    fn start(&self, ctx: &SetContext) -> ResourceResult<()> {
        self.allow_linking.store(ctx.allow_linking, Ordering::Relaxed);
        tracing::debug!(
            mount = self.mount.webapp_path(),
            base = %self.base.display(),
            allow_linking = ctx.allow_linking,
            "started directory set"
        );
        Ok(())
    }

    fn stop(&self) {
        tracing::debug!(mount = self.mount.webapp_path(), "stopped directory set");
    }
}

fn read_dir_sorted(dir: &Path) -> io::Result<Vec<(String, bool)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        entries.push((name, is_dir));
    }
    entries.sort_unstable();
    Ok(entries)
}

fn write_file(file: &Path, data: &mut dyn Read) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(file)?);
    let bytes = io::copy(data, &mut out)?;
    out.flush()?;
    Ok(bytes)
}
