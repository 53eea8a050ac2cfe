//! Configuration for a resource root.
//!
//! A [`Config`] can be read from JSON or assembled with [`ConfigBuilder`],
//! then turned into a root with
//! [`ResourceRoot::from_config`](crate::ResourceRoot::from_config).
//!
//! ```json
//! {
//!   "cache_ttl_ms": 5000,
//!   "archive_bloom": true,
//!   "mounts": [
//!     { "kind": "dir", "base_path": "webapp" },
//!     { "group": "contributed", "kind": "nested-archive",
//!       "base_path": "app.war", "archive_path": "WEB-INF/lib/ui.jar",
//!       "internal_path": "/META-INF/resources" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_MAX_SIZE, DEFAULT_TTL_MS};
use crate::error::{ResourceError, ResourceResult};
use crate::set::{
    ArchiveResourceSet, DirResourceSet, FileResourceSet, MountPoint, SetOptions, SetRef,
};

/// Root-wide settings and the ordered mount list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Route lookups through the cache.
    pub caching_allowed: bool,
    /// Revalidation interval in milliseconds.
    pub cache_ttl_ms: u64,
    /// Total cache size in bytes.
    pub cache_max_size: u64,
    /// Largest cacheable content in bytes. Defaults to a twentieth of the total.
    pub cache_object_max_size: Option<u64>,
    /// Follow symlinks out of directory sets.
    pub allow_linking: bool,
    /// Build bloom pre-checks for archive indexes.
    pub archive_bloom: bool,
    /// Mounts, in order within each group.
    pub mounts: Vec<MountDef>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            caching_allowed: true,
            cache_ttl_ms: DEFAULT_TTL_MS,
            cache_max_size: DEFAULT_MAX_SIZE,
            cache_object_max_size: None,
            allow_linking: false,
            archive_bloom: false,
            mounts: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> ResourceResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> ResourceResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    fn check(&self) -> ResourceResult<()> {
        let mains = self
            .mounts
            .iter()
            .filter(|m| m.group == SetGroup::Main)
            .count();
        match mains {
            0 => Err(ResourceError::MissingMain),
            1 => Ok(()),
            _ => Err(ResourceError::DuplicateMain),
        }
    }
}

/// Which group a set is added to. Groups are consulted in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetGroup {
    /// Consulted before main; shadows main for mutations.
    Pre,
    /// The document base. Exactly one.
    #[default]
    Main,
    /// Library archives, consulted after main.
    Contributed,
    /// Consulted last.
    Post,
}

/// Backend kind of a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MountKind {
    /// Directory on disk.
    Dir,
    /// Single file on disk.
    File,
    /// Archive file on disk.
    Archive,
    /// Archive stored at `archive_path` inside the archive `base_path`.
    NestedArchive,
}

/// One mount definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountDef {
    /// Group the set is added to.
    #[serde(default)]
    pub group: SetGroup,
    /// Backend kind.
    pub kind: MountKind,
    /// Where the set appears in the webapp.
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
    /// Directory, file or archive on disk.
    pub base_path: PathBuf,
    /// Inner archive entry, for nested archives.
    #[serde(default)]
    pub archive_path: Option<String>,
    /// Part of the backend exposed at `mount_path`.
    #[serde(default)]
    pub internal_path: String,
    /// Reject mutations.
    #[serde(default)]
    pub read_only: bool,
    /// Only answer class-loader lookups.
    #[serde(default)]
    pub class_loader_only: bool,
    /// Only answer static lookups.
    #[serde(default)]
    pub static_only: bool,
}

fn default_mount_path() -> String {
    "/".to_string()
}

impl MountDef {
    /// A mount of `kind` at the webapp root.
    pub fn new(kind: MountKind, base_path: impl Into<PathBuf>) -> Self {
        Self {
            group: SetGroup::Main,
            kind,
            mount_path: default_mount_path(),
            base_path: base_path.into(),
            archive_path: None,
            internal_path: String::new(),
            read_only: false,
            class_loader_only: false,
            static_only: false,
        }
    }

    /// A nested archive mount.
    pub fn nested(outer: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            archive_path: Some(entry.into()),
            ..Self::new(MountKind::NestedArchive, outer)
        }
    }

    /// Set the group.
    pub fn group(mut self, group: SetGroup) -> Self {
        self.group = group;
        self
    }

    /// Set the webapp mount path.
    pub fn at(mut self, mount_path: impl Into<String>) -> Self {
        self.mount_path = mount_path.into();
        self
    }

    /// Set the internal path.
    pub fn internal(mut self, internal_path: impl Into<String>) -> Self {
        self.internal_path = internal_path.into();
        self
    }

    /// Mark the set read-only.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    fn options(&self) -> SetOptions {
        SetOptions {
            read_only: self.read_only,
            class_loader_only: self.class_loader_only,
            static_only: self.static_only,
        }
    }

    /// Create the resource set this definition describes.
    pub fn build(&self) -> ResourceResult<SetRef> {
        let mount = MountPoint::new(&self.mount_path, &self.internal_path);
        let options = self.options();
        let set: SetRef = match self.kind {
            MountKind::Dir => Arc::new(DirResourceSet::new(mount, &self.base_path, options)?),
            MountKind::File => Arc::new(FileResourceSet::new(mount, &self.base_path, options)?),
            MountKind::Archive => Arc::new(ArchiveResourceSet::new(mount, &self.base_path, options)?),
            MountKind::NestedArchive => {
                let entry = self.archive_path.as_deref().ok_or_else(|| {
                    ResourceError::Config(format!(
                        "nested-archive mount at {} needs archive_path",
                        self.mount_path
                    ))
                })?;
                Arc::new(ArchiveResourceSet::nested(mount, &self.base_path, entry, options)?)
            }
        };
        Ok(set)
    }
}

/// Configuration builder for fluent API.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching. Default: enabled.
    pub fn caching_allowed(mut self, allowed: bool) -> Self {
        self.config.caching_allowed = allowed;
        self
    }

    /// Revalidation interval. Default: 5000 ms.
    pub fn cache_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.config.cache_ttl_ms = ttl_ms;
        self
    }

    /// Total cache size. Default: 10 MiB.
    pub fn cache_max_size(mut self, max_size: u64) -> Self {
        self.config.cache_max_size = max_size;
        self
    }

    /// Largest cacheable content.
    pub fn cache_object_max_size(mut self, object_max_size: u64) -> Self {
        self.config.cache_object_max_size = Some(object_max_size);
        self
    }

    /// Follow symlinks out of directory sets.
    pub fn allow_linking(mut self, allow: bool) -> Self {
        self.config.allow_linking = allow;
        self
    }

    /// Build bloom pre-checks for archive indexes.
    pub fn archive_bloom(mut self, enabled: bool) -> Self {
        self.config.archive_bloom = enabled;
        self
    }

    /// Append a mount.
    pub fn mount(mut self, mount: MountDef) -> Self {
        self.config.mounts.push(mount);
        self
    }

    /// Finish, checking that exactly one main mount is present.
    pub fn build(self) -> ResourceResult<Config> {
        self.config.check()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceRoot;
    use crate::resource::WebResource;
    use crate::testing::{write_zip, zip_bytes};
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.caching_allowed);
        assert_eq!(config.cache_ttl_ms, 5_000);
        assert_eq!(config.cache_max_size, 10 * 1024 * 1024);
        assert!(!config.allow_linking);
    }

    #[test]
    fn test_parse_json() {
        let config = Config::from_json(
            r#"{
                "cache_ttl_ms": 1000,
                "archive_bloom": true,
                "mounts": [
                    { "kind": "dir", "base_path": "webapp" },
                    { "group": "contributed", "kind": "nested-archive",
                      "base_path": "app.war", "archive_path": "WEB-INF/lib/ui.jar",
                      "internal_path": "/META-INF/resources", "read_only": true }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.cache_ttl_ms, 1000);
        assert!(config.archive_bloom);
        assert!(config.caching_allowed);
        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[0].group, SetGroup::Main);
        assert_eq!(config.mounts[0].mount_path, "/");
        assert_eq!(config.mounts[1].kind, MountKind::NestedArchive);
        assert_eq!(config.mounts[1].archive_path.as_deref(), Some("WEB-INF/lib/ui.jar"));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(ResourceError::Json(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "mounts": [] }"#),
            Err(ResourceError::MissingMain)
        ));
        assert!(Config::from_json(r#"{ "mounts": [{ "kind": "tarball", "base_path": "x" }] }"#).is_err());
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::new()
            .cache_ttl_ms(10)
            .mount(MountDef::new(MountKind::Dir, "webapp"))
            .mount(MountDef::new(MountKind::Dir, "extra").group(SetGroup::Pre).at("/extra"))
            .build()
            .unwrap();
        assert_eq!(config.cache_ttl_ms, 10);
        assert_eq!(config.mounts[1].mount_path, "/extra");

        let err = ConfigBuilder::new()
            .mount(MountDef::new(MountKind::Dir, "a"))
            .mount(MountDef::new(MountKind::Dir, "b"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ResourceError::DuplicateMain));
    }

    #[test]
    fn test_nested_archive_needs_entry() {
        let dir = TempDir::new().unwrap();
        let war = dir.path().join("app.war");
        write_zip(&war, &[("a.txt", b"a")]);

        let mut mount = MountDef::nested(&war, "lib/x.jar");
        mount.archive_path = None;
        assert!(matches!(mount.build(), Err(ResourceError::Config(_))));
    }

    #[test]
    fn test_root_from_config() {
        let dir = TempDir::new().unwrap();
        let webapp = dir.path().join("webapp");
        std::fs::create_dir(&webapp).unwrap();
        std::fs::write(webapp.join("index.html"), "home").unwrap();
        let war = dir.path().join("app.war");
        let inner = zip_bytes(&[("META-INF/resources/foo.css", b"css")]);
        write_zip(&war, &[("WEB-INF/lib/ui.jar", &inner)]);

        let config = ConfigBuilder::new()
            .archive_bloom(true)
            .mount(MountDef::new(MountKind::Dir, &webapp))
            .mount(
                MountDef::nested(&war, "WEB-INF/lib/ui.jar")
                    .group(SetGroup::Contributed)
                    .internal("/META-INF/resources"),
            )
            .build()
            .unwrap();

        let root = ResourceRoot::from_config(&config).unwrap();
        root.start().unwrap();
        assert!(root.get_resource("/index.html").unwrap().exists());
        assert!(root.get_resource("/foo.css").unwrap().exists());
        assert!(!root.get_resource("/bar.css").unwrap().exists());
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resources.json");
        std::fs::write(&path, r#"{ "mounts": [{ "kind": "dir", "base_path": "." }] }"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.mounts[0].kind, MountKind::Dir);
        assert!(matches!(
            Config::from_file(dir.path().join("missing.json")),
            Err(ResourceError::Io(_))
        ));
    }
}
