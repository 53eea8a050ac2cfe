//! Mount point translation shared by all set variants.

use crate::path::with_trailing_slash;

/// Where a set appears in the webapp namespace, and which part of its
/// backend is exposed there.
///
/// Both prefixes are stored without a trailing `/`, so a mount at the webapp
/// root is the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    webapp: String,
    internal: String,
}

impl MountPoint {
    /// Mount `internal_path` of the backend at `webapp_path`.
    pub fn new(webapp_path: &str, internal_path: &str) -> Self {
        Self {
            webapp: trim_prefix(webapp_path),
            internal: trim_prefix(internal_path),
        }
    }

    /// Mount the whole backend at the webapp root.
    pub fn root() -> Self {
        Self::new("/", "")
    }

    /// Webapp mount path, `/` for the root.
    pub fn webapp_path(&self) -> &str {
        if self.webapp.is_empty() { "/" } else { &self.webapp }
    }

    /// Internal prefix, empty when the whole backend is exposed.
    pub fn internal_path(&self) -> &str {
        &self.internal
    }

    /// Whether `path` is the mount itself or lies under it.
    pub fn is_mounted(&self, path: &str) -> bool {
        path.strip_prefix(self.webapp.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Translate a mounted webapp path into a backend path
    /// (`internal + remainder`). `None` when `path` is not mounted.
    ///
    /// The result is empty or `/`-prefixed.
    pub fn translate(&self, path: &str) -> Option<String> {
        if !self.is_mounted(path) {
            return None;
        }
        let rest = &path[self.webapp.len()..];
        Some(format!("{}{rest}", self.internal))
    }

    /// Whether the mount lies strictly below `path`.
    pub fn is_below(&self, path: &str) -> bool {
        let dir = with_trailing_slash(path);
        self.webapp.len() > dir.len() && self.webapp.starts_with(&dir)
    }

    /// First mount segment beneath `path`, when the mount lies below it.
    pub fn next_segment(&self, path: &str) -> Option<&str> {
        if !self.is_below(path) {
            return None;
        }
        let rest = &self.webapp[with_trailing_slash(path).len()..];
        rest.split('/').next()
    }
}

impl Default for MountPoint {
    fn default() -> Self {
        Self::root()
    }
}

fn trim_prefix(path: &str) -> String {
    let path = path.trim_end_matches('/');
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_mount() {
        let mount = MountPoint::root();
        assert_eq!(mount.webapp_path(), "/");
        assert!(mount.is_mounted("/"));
        assert!(mount.is_mounted("/a/b.txt"));
        assert_eq!(mount.translate("/a/b.txt").as_deref(), Some("/a/b.txt"));
        assert!(!mount.is_below("/"));
    }

    #[test]
    fn test_sub_mount_boundaries() {
        let mount = MountPoint::new("/static/", "/assets");
        assert!(mount.is_mounted("/static"));
        assert!(mount.is_mounted("/static/x.css"));
        assert!(!mount.is_mounted("/staticfoo"));
        assert!(!mount.is_mounted("/"));
        assert_eq!(mount.translate("/static").as_deref(), Some("/assets"));
        assert_eq!(mount.translate("/static/x.css").as_deref(), Some("/assets/x.css"));
        assert_eq!(mount.translate("/other"), None);
    }

    #[test]
    fn test_mount_below_path() {
        let mount = MountPoint::new("/WEB-INF/lib/app.jar", "");
        assert!(mount.is_below("/"));
        assert!(mount.is_below("/WEB-INF"));
        assert!(mount.is_below("/WEB-INF/lib/"));
        assert!(!mount.is_below("/WEB-INF/lib/app.jar"));
        assert!(!mount.is_below("/WEB"));
        assert_eq!(mount.next_segment("/"), Some("WEB-INF"));
        assert_eq!(mount.next_segment("/WEB-INF/lib"), Some("app.jar"));
        assert_eq!(mount.next_segment("/static"), None);
    }

    #[test]
    fn test_relative_prefixes_are_rooted() {
        let mount = MountPoint::new("static", "META-INF/resources/");
        assert_eq!(mount.webapp_path(), "/static");
        assert_eq!(mount.internal_path(), "/META-INF/resources");
    }
}
