//! Fluent construction of a [`ResourceRoot`].

use std::path::Path;
use std::sync::Arc;

use super::ResourceRoot;
use crate::cache::CacheStrategy;
use crate::config::{Config, SetGroup};
use crate::error::{ResourceError, ResourceResult};
use crate::set::{ArchiveResourceSet, DirResourceSet, MountPoint, ResourceSet, SetContext, SetOptions, SetRef};

/// Archive extensions accepted as a document base.
const ARCHIVE_EXTENSIONS: &[&str] = &["war", "jar", "zip"];

/// Builder for [`ResourceRoot`].
///
/// # Example
///
/// ```ignore
/// let root = RootBuilder::new()
///     .main_base("webapp")?
///     .pre(FileResourceSet::new(MountPoint::new("/WEB-INF/web.xml", ""), "conf/web.xml", SetOptions::default())?)
///     .cache_ttl_ms(10_000)
///     .build()?;
/// root.start()?;
/// ```
#[derive(Default)]
pub struct RootBuilder {
    pre: Vec<SetRef>,
    main: Vec<SetRef>,
    contributed: Vec<SetRef>,
    post: Vec<SetRef>,
    caching_allowed: Option<bool>,
    cache_ttl_ms: Option<u64>,
    cache_max_size: Option<u64>,
    cache_object_max_size: Option<u64>,
    strategy: Option<Arc<dyn CacheStrategy>>,
    context: SetContext,
}

impl RootBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with every setting and mount from `config`.
    pub fn from_config(config: &Config) -> ResourceResult<Self> {
        let mut builder = Self::new()
            .caching_allowed(config.caching_allowed)
            .cache_ttl_ms(config.cache_ttl_ms)
            .cache_max_size(config.cache_max_size)
            .allow_linking(config.allow_linking)
            .archive_bloom(config.archive_bloom);
        if let Some(object_max_size) = config.cache_object_max_size {
            builder = builder.cache_object_max_size(object_max_size);
        }
        for mount in &config.mounts {
            builder = builder.add(mount.group, mount.build()?);
        }
        Ok(builder)
    }

    // =========================================================================
    // Sets
    // =========================================================================

    /// Add a set to `group`.
    pub fn add(mut self, group: SetGroup, set: SetRef) -> Self {
        match group {
            SetGroup::Pre => self.pre.push(set),
            SetGroup::Main => self.main.push(set),
            SetGroup::Contributed => self.contributed.push(set),
            SetGroup::Post => self.post.push(set),
        }
        self
    }

    /// Add a set consulted before main.
    pub fn pre(self, set: impl ResourceSet + 'static) -> Self {
        self.add(SetGroup::Pre, Arc::new(set))
    }

    /// Set the main set.
    pub fn main(self, set: impl ResourceSet + 'static) -> Self {
        self.add(SetGroup::Main, Arc::new(set))
    }

    /// Add a library archive set, consulted after main.
    pub fn contributed(self, set: impl ResourceSet + 'static) -> Self {
        self.add(SetGroup::Contributed, Arc::new(set))
    }

    /// Add a set consulted last.
    pub fn post(self, set: impl ResourceSet + 'static) -> Self {
        self.add(SetGroup::Post, Arc::new(set))
    }

    /// Use `base` as the document base: a directory, or a `.war`, `.jar` or
    /// `.zip` archive, mounted writable (directories) at the root.
    pub fn main_base(self, base: impl AsRef<Path>) -> ResourceResult<Self> {
        let base = base.as_ref();
        if base.is_dir() {
            let set = DirResourceSet::new(MountPoint::root(), base, SetOptions::default())?;
            return Ok(self.main(set));
        }

        let is_archive = base
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ARCHIVE_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)));
        if base.is_file() && is_archive {
            let set = ArchiveResourceSet::new(MountPoint::root(), base, SetOptions::read_only())?;
            return Ok(self.main(set));
        }

        Err(ResourceError::InvalidBase {
            kind: "main",
            path: base.to_path_buf(),
        })
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Enable or disable the cache. Default: enabled.
    pub fn caching_allowed(mut self, allowed: bool) -> Self {
        self.caching_allowed = Some(allowed);
        self
    }

    /// Revalidation interval. Default: 5000 ms.
    pub fn cache_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.cache_ttl_ms = Some(ttl_ms);
        self
    }

    /// Total cache size. Default: 10 MiB.
    pub fn cache_max_size(mut self, max_size: u64) -> Self {
        self.cache_max_size = Some(max_size);
        self
    }

    /// Largest cacheable content. Default and upper bound: a twentieth of the
    /// total size.
    pub fn cache_object_max_size(mut self, object_max_size: u64) -> Self {
        self.cache_object_max_size = Some(object_max_size);
        self
    }

    /// Exclude paths from caching.
    pub fn cache_strategy(mut self, strategy: impl CacheStrategy + 'static) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Follow symlinks out of directory sets. Default: off.
    pub fn allow_linking(mut self, allow: bool) -> Self {
        self.context.allow_linking = allow;
        self
    }

    /// Build bloom pre-checks for archive indexes. Default: off.
    pub fn archive_bloom(mut self, enabled: bool) -> Self {
        self.context.archive_bloom = enabled;
        self
    }

    /// Build the root. It still has to be started.
    pub fn build(self) -> ResourceResult<ResourceRoot> {
        let mut main = self.main;
        let main_set = match main.len() {
            0 => return Err(ResourceError::MissingMain),
            1 => main.remove(0),
            _ => return Err(ResourceError::DuplicateMain),
        };

        let root = ResourceRoot::new(
            self.pre,
            main_set,
            self.contributed,
            self.post,
            self.context,
        );
        let cache = root.cache();
        if let Some(ttl_ms) = self.cache_ttl_ms {
            cache.set_ttl_ms(ttl_ms);
        }
        if let Some(max_size) = self.cache_max_size {
            cache.set_max_size(max_size);
        }
        if let Some(object_max_size) = self.cache_object_max_size {
            cache.set_object_max_size(object_max_size);
        }
        cache.set_strategy(self.strategy);
        if let Some(allowed) = self.caching_allowed {
            root.set_caching_allowed(allowed);
        }
        Ok(root)
    }
}
