//! Look-aside cache in front of a [`ResourceLookup`].
//!
//! # Architecture
//!
//! ```text
//! get_resource(path, kind)
//!   │
//!   ├─ never cached / strategy veto ─────────────► backend.lookup()
//!   │
//!   ├─ hit ── validate(kind) ── ok ──────────────► cached entry
//!   │                        └─ stale ─► remove ─┐
//!   │                                            ▼
//!   └─ miss ──► insert-if-absent ─┬─ winner: populate, account, evict if full
//!                                 └─ loser:  same kind, join the winner;
//!                                            else serve own uncached entry
//! ```
//!
//! Sizes are approximate: each entry counts a fixed overhead plus its
//! content length capped at the per-object limit. The running total is a
//! single atomic and may briefly disagree with the map.
//!
//! Two eviction passes only ever remove entries:
//! - request-time, in map order, down to 95% of the limit
//! - [`Cache::background_process`], stalest first, down to 90%
//!
//! Neither evicts an entry before its TTL has elapsed.

mod entry;
mod slot;

pub use entry::CachedResource;
pub use slot::SlotCell;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::error::ResourceResult;
use crate::lookup::{LookupKind, ResourceLookup};
use crate::resource::ResourceRef;
use self::entry::now_millis;

/// Fixed per-entry bookkeeping cost, in bytes.
pub const ENTRY_OVERHEAD: u64 = 500;

/// Default time between revalidations.
pub const DEFAULT_TTL_MS: u64 = 5_000;

/// Default total cache size.
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// The per-object limit may not exceed this fraction of the total.
const OBJECT_MAX_DIVISOR: u64 = 20;

const TARGET_FREE_PERCENT_GET: u64 = 5;
const TARGET_FREE_PERCENT_BACKGROUND: u64 = 10;

// =============================================================================
// CacheStrategy
// =============================================================================

/// Per-path cache exclusion.
pub trait CacheStrategy: Send + Sync {
    /// Return `true` to bypass the cache for `path`.
    fn no_cache(&self, path: &str) -> bool;
}

impl<F> CacheStrategy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn no_cache(&self, path: &str) -> bool {
        self(path)
    }
}

// =============================================================================
// Shared state
// =============================================================================

/// State reachable from entries, so deleting a cached resource can evict it.
#[derive(Debug)]
pub(crate) struct CacheShared {
    entries: DashMap<String, Arc<CachedResource>, FxBuildHasher>,
    size: AtomicU64,
}

impl CacheShared {
    /// Remove `path` if it still maps to `entry`.
    pub(crate) fn remove_entry(&self, path: &str, entry: &CachedResource) -> bool {
        let removed = self
            .entries
            .remove_if(path, |_, current| std::ptr::eq(Arc::as_ptr(current), entry))
            .is_some();
        if removed {
            self.size.fetch_sub(entry.take_accounted(), Ordering::AcqRel);
        }
        removed
    }

    fn holds(&self, path: &str, entry: &Arc<CachedResource>) -> bool {
        self.entries
            .get(path)
            .is_some_and(|current| Arc::ptr_eq(current.value(), entry))
    }

    fn snapshot(&self) -> Vec<Arc<CachedResource>> {
        self.entries.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Remove due entries in `order` until the total is at most `target`.
    /// Returns the total afterwards.
    fn evict(&self, target: u64, order: impl IntoIterator<Item = Arc<CachedResource>>) -> u64 {
        let now = now_millis();
        let mut size = self.size.load(Ordering::Acquire);
        for entry in order {
            if size <= target {
                break;
            }
            if !entry.is_populated() || !entry.is_due(now) {
                continue;
            }
            self.remove_entry(entry.path(), &entry);
            size = self.size.load(Ordering::Acquire);
        }
        size
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Bounded, TTL-validated resource cache.
pub struct Cache {
    shared: Arc<CacheShared>,
    backend: Arc<dyn ResourceLookup>,
    strategy: RwLock<Option<Arc<dyn CacheStrategy>>>,
    ttl_ms: AtomicU64,
    max_size: AtomicU64,
    object_max_size: AtomicU64,
    lookup_count: AtomicU64,
    hit_count: AtomicU64,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.len())
            .field("size", &self.size())
            .field("ttl_ms", &self.ttl_ms())
            .field("max_size", &self.max_size())
            .field("object_max_size", &self.object_max_size())
            .field("has_strategy", &self.strategy.read().is_some())
            .finish()
    }
}

impl Cache {
    /// Create a cache with default limits in front of `backend`.
    pub fn new(backend: Arc<dyn ResourceLookup>) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                entries: DashMap::with_hasher(FxBuildHasher),
                size: AtomicU64::new(0),
            }),
            backend,
            strategy: RwLock::new(None),
            ttl_ms: AtomicU64::new(DEFAULT_TTL_MS),
            max_size: AtomicU64::new(DEFAULT_MAX_SIZE),
            object_max_size: AtomicU64::new(DEFAULT_MAX_SIZE / OBJECT_MAX_DIVISOR),
            lookup_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Limits
    // =========================================================================

    /// Time between revalidations of an entry.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms.load(Ordering::Relaxed)
    }

    /// Set the revalidation interval. Applies to entries created afterwards.
    pub fn set_ttl_ms(&self, ttl_ms: u64) {
        self.ttl_ms.store(ttl_ms, Ordering::Relaxed);
    }

    /// Total size limit in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size.load(Ordering::Relaxed)
    }

    /// Set the total size limit, clamping the per-object limit to match.
    pub fn set_max_size(&self, max_size: u64) {
        self.max_size.store(max_size, Ordering::Relaxed);
        self.set_object_max_size(self.object_max_size());
    }

    /// Largest content that will be cached, in bytes.
    pub fn object_max_size(&self) -> u64 {
        self.object_max_size.load(Ordering::Relaxed)
    }

    /// Set the per-object limit. Values above a twentieth of the total are
    /// clamped.
    pub fn set_object_max_size(&self, object_max_size: u64) {
        let limit = self.max_size() / OBJECT_MAX_DIVISOR;
        let value = if object_max_size > limit {
            tracing::warn!(
                requested = object_max_size,
                limit,
                max_size = self.max_size(),
                "cache object max size too large for total size, clamping"
            );
            limit
        } else {
            object_max_size
        };
        self.object_max_size.store(value, Ordering::Relaxed);
    }

    /// Attach or clear the exclusion strategy.
    pub fn set_strategy(&self, strategy: Option<Arc<dyn CacheStrategy>>) {
        *self.strategy.write() = strategy;
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Approximate bytes held.
    pub fn size(&self) -> u64 {
        self.shared.size.load(Ordering::Acquire)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }

    /// Cacheable lookups served so far.
    pub fn lookup_count(&self) -> u64 {
        self.lookup_count.load(Ordering::Relaxed)
    }

    /// Lookups answered by a valid existing entry.
    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Resolve `path` through the cache.
    pub fn get_resource(&self, path: &str, kind: LookupKind) -> ResourceResult<ResourceRef> {
        if self.bypass(path) {
            return self.backend.lookup(path, kind);
        }
        self.lookup_count.fetch_add(1, Ordering::Relaxed);

        let existing = self.shared.entries.get(path).map(|e| Arc::clone(e.value()));
        if let Some(entry) = existing {
            if entry.validate(kind)? {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                return Ok(entry);
            }
            self.shared.remove_entry(path, &entry);
        }
        self.insert_or_join(path, kind)
    }

    /// Miss path: race to insert a new entry. The loser joins the winner
    /// when their kinds agree.
    fn insert_or_join(&self, path: &str, kind: LookupKind) -> ResourceResult<ResourceRef> {
        let fresh = Arc::new(CachedResource::new(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.backend),
            path,
            kind,
            self.ttl_ms(),
            self.object_max_size(),
        ));

        let winner = match self.shared.entries.entry(path.to_string()) {
            Entry::Occupied(occupied) => Some(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&fresh));
                None
            }
        };

        match winner {
            None => {
                self.admit(path, &fresh)?;
                Ok(fresh)
            }
            Some(winner) if winner.kind() == kind => {
                winner.validate(kind)?;
                Ok(winner)
            }
            Some(_) => {
                // Kind disagrees with the winner: serve this call uncached
                fresh.validate(kind)?;
                Ok(fresh)
            }
        }
    }

    /// Populate a freshly inserted entry and account for it.
    fn admit(&self, path: &str, entry: &Arc<CachedResource>) -> ResourceResult<()> {
        if let Err(e) = entry.validate(entry.kind()) {
            self.shared.remove_entry(path, entry);
            return Err(e);
        }

        let delta = entry.size();
        entry.add_accounted(delta);
        let mut size = self.shared.size.fetch_add(delta, Ordering::AcqRel) + delta;
        if !self.shared.holds(path, entry) {
            // Evicted between insert and accounting
            self.shared
                .size
                .fetch_sub(entry.take_accounted(), Ordering::AcqRel);
            return Ok(());
        }

        let max_size = self.max_size();
        if size > max_size {
            let target = max_size * (100 - TARGET_FREE_PERCENT_GET) / 100;
            size = self.shared.evict(target, self.shared.snapshot());
            if size > max_size {
                self.shared.remove_entry(path, entry);
                tracing::warn!(
                    path,
                    size,
                    max_size,
                    "unable to add resource to cache, not enough free space"
                );
            }
        }
        Ok(())
    }

    fn bypass(&self, path: &str) -> bool {
        if never_cache(path) {
            return true;
        }
        self.strategy
            .read()
            .as_ref()
            .is_some_and(|strategy| strategy.no_cache(path))
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Periodic eviction, stalest entries first, down to 90% of the limit.
    pub fn background_process(&self) {
        let mut order = self.shared.snapshot();
        order.sort_by_key(|entry| entry.next_check());

        let max_size = self.max_size();
        let target = max_size * (100 - TARGET_FREE_PERCENT_BACKGROUND) / 100;
        let size = self.shared.evict(target, order);
        if size > target {
            tracing::info!(
                size,
                target,
                max_size,
                "background cache eviction could not reach target size"
            );
        }
    }

    /// Drop the entry for `path`, if any.
    pub fn remove(&self, path: &str) -> bool {
        match self.shared.entries.remove(path) {
            Some((_, entry)) => {
                self.shared
                    .size
                    .fetch_sub(entry.take_accounted(), Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let shared = &self.shared;
        shared.entries.retain(|_, entry| {
            shared.size.fetch_sub(entry.take_accounted(), Ordering::AcqRel);
            false
        });
    }
}

/// Paths that are never cached: compiled classes and library archives.
fn never_cache(path: &str) -> bool {
    let in_lib = path.starts_with("/WEB-INF/lib/");
    (path.ends_with(".class") && (in_lib || path.starts_with("/WEB-INF/classes/")))
        || (path.ends_with(".jar") && in_lib)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{EmptyResource, FileResource};
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Directory-backed lookup that counts calls.
    #[derive(Default)]
    struct CountingLookup {
        base: PathBuf,
        lookups: AtomicUsize,
        kinds: Mutex<FxHashMap<String, LookupKind>>,
    }

    impl CountingLookup {
        fn new(base: &std::path::Path) -> Arc<Self> {
            Arc::new(Self {
                base: base.to_path_buf(),
                ..Self::default()
            })
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl ResourceLookup for CountingLookup {
        fn lookup(&self, path: &str, kind: LookupKind) -> ResourceResult<ResourceRef> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.kinds.lock().insert(path.to_string(), kind);
            let file = self.base.join(path.trim_start_matches('/'));
            if file.exists() {
                Ok(Arc::new(FileResource::new(path, file, false)))
            } else {
                Ok(Arc::new(EmptyResource::new(path)))
            }
        }
    }

    /// Lookup that always fails.
    struct FailingLookup;

    impl ResourceLookup for FailingLookup {
        fn lookup(&self, _path: &str, _kind: LookupKind) -> ResourceResult<ResourceRef> {
            Err(std::io::Error::other("backend down").into())
        }
    }

    fn cache_over(lookup: &Arc<CountingLookup>) -> Cache {
        Cache::new(Arc::clone(lookup) as Arc<dyn ResourceLookup>)
    }

    #[test]
    fn test_second_lookup_within_ttl_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.bin"), vec![7u8; 900 * 1024]).unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_ttl_ms(1_000);
        cache.set_max_size(1024 * 1024);

        let first = cache.get_resource("/big.bin", LookupKind::Static).unwrap();
        assert!(first.exists());
        assert_eq!(first.content_length(), Some(900 * 1024));
        assert_eq!(lookup.lookups(), 1);

        let second = cache.get_resource("/big.bin", LookupKind::Static).unwrap();
        assert_eq!(second.content_length(), Some(900 * 1024));
        assert_eq!(lookup.lookups(), 1);
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.lookup_count(), 2);
    }

    #[test]
    fn test_changes_hidden_until_ttl_elapses() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "short").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_ttl_ms(200);

        let res = cache.get_resource("/a.txt", LookupKind::Static).unwrap();
        assert_eq!(res.content_length(), Some(5));

        fs::write(&file, "much longer now").unwrap();
        let res = cache.get_resource("/a.txt", LookupKind::Static).unwrap();
        assert_eq!(res.content_length(), Some(5));

        thread::sleep(Duration::from_millis(300));
        let res = cache.get_resource("/a.txt", LookupKind::Static).unwrap();
        assert_eq!(res.content_length(), Some(15));
    }

    #[test]
    fn test_deleted_file_detected_after_ttl() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("gone.txt");
        fs::write(&file, "x").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_ttl_ms(50);

        assert!(cache.get_resource("/gone.txt", LookupKind::Static).unwrap().exists());
        fs::remove_file(&file).unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(!cache.get_resource("/gone.txt", LookupKind::Static).unwrap().exists());
    }

    #[test]
    fn test_never_cache_paths_bypass() {
        assert!(never_cache("/WEB-INF/classes/com/App.class"));
        assert!(never_cache("/WEB-INF/lib/a.jar"));
        assert!(never_cache("/WEB-INF/lib/x/Y.class"));
        assert!(!never_cache("/WEB-INF/classes/app.properties"));
        assert!(!never_cache("/static/a.jar"));

        let dir = TempDir::new().unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.get_resource("/WEB-INF/lib/a.jar", LookupKind::Static).unwrap();
        cache.get_resource("/WEB-INF/lib/a.jar", LookupKind::Static).unwrap();
        assert_eq!(lookup.lookups(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.lookup_count(), 0);
    }

    #[test]
    fn test_strategy_veto() {
        let dir = TempDir::new().unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_strategy(Some(Arc::new(|path: &str| path.ends_with(".tmp"))));

        cache.get_resource("/x.tmp", LookupKind::Static).unwrap();
        cache.get_resource("/x.html", LookupKind::Static).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_kind_mismatch_replaces_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);

        cache.get_resource("/a.txt", LookupKind::Static).unwrap();
        cache.get_resource("/a.txt", LookupKind::ClassLoader).unwrap();
        assert_eq!(lookup.lookups(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(lookup.kinds.lock().get("/a.txt"), Some(&LookupKind::ClassLoader));
        assert_eq!(cache.hit_count(), 0);
    }

    /// Insert an unpopulated entry, as a concurrent winner would.
    fn insert_pending(cache: &Cache, path: &str, kind: LookupKind) -> Arc<CachedResource> {
        let entry = Arc::new(CachedResource::new(
            Arc::downgrade(&cache.shared),
            Arc::clone(&cache.backend),
            path,
            kind,
            cache.ttl_ms(),
            cache.object_max_size(),
        ));
        cache.shared.entries.insert(path.to_string(), Arc::clone(&entry));
        entry
    }

    fn same_entry(res: &ResourceRef, entry: &Arc<CachedResource>) -> bool {
        Arc::as_ptr(res).cast::<()>() == Arc::as_ptr(entry).cast::<()>()
    }

    #[test]
    fn test_race_loser_with_same_kind_joins_winner() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);

        let winner = insert_pending(&cache, "/a.txt", LookupKind::Static);
        let res = cache.insert_or_join("/a.txt", LookupKind::Static).unwrap();
        assert!(same_entry(&res, &winner));
        assert!(winner.is_populated());
        assert_eq!(lookup.lookups(), 1);
    }

    #[test]
    fn test_race_loser_with_other_kind_serves_own_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);

        let winner = insert_pending(&cache, "/a.txt", LookupKind::Static);
        let res = cache.insert_or_join("/a.txt", LookupKind::ClassLoader).unwrap();
        assert!(!same_entry(&res, &winner));
        assert!(res.exists());
        assert!(!winner.is_populated());
        assert_eq!(cache.len(), 1);
        assert_eq!(lookup.kinds.lock().get("/a.txt"), Some(&LookupKind::ClassLoader));
    }

    #[test]
    fn test_oversized_content_passes_through() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.bin"), vec![1u8; 2048]).unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_max_size(20 * 1024);
        cache.set_object_max_size(1024);

        let res = cache.get_resource("/big.bin", LookupKind::Static).unwrap();
        assert!(res.content().unwrap().is_none());

        let mut buf = Vec::new();
        res.open().unwrap().unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), 2048);
        assert_eq!(cache.size(), ENTRY_OVERHEAD + 1024);
    }

    #[test]
    fn test_content_grown_after_populate_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("grow.txt");
        fs::write(&file, "small").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_ttl_ms(10_000);
        cache.set_max_size(20_000);
        cache.set_object_max_size(1000);

        let res = cache.get_resource("/grow.txt", LookupKind::Static).unwrap();
        assert_eq!(res.content_length(), Some(5));
        fs::write(&file, vec![b'x'; 50_000]).unwrap();

        assert!(res.content().unwrap().is_none());
        assert_eq!(cache.size(), ENTRY_OVERHEAD + 5);

        let again = cache.get_resource("/grow.txt", LookupKind::Static).unwrap();
        assert_eq!(cache.hit_count(), 1);
        assert!(again.content().unwrap().is_none());

        let mut buf = Vec::new();
        again.open().unwrap().unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), 50_000);
    }

    #[test]
    fn test_object_max_size_is_clamped() {
        let dir = TempDir::new().unwrap();
        let cache = cache_over(&CountingLookup::new(dir.path()));
        cache.set_max_size(2000);
        cache.set_object_max_size(1000);
        assert_eq!(cache.object_max_size(), 100);
    }

    #[test]
    fn test_size_stays_bounded() {
        let dir = TempDir::new().unwrap();
        for i in 0..40 {
            fs::write(dir.path().join(format!("f{i}.txt")), vec![b'x'; 400]).unwrap();
        }
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_ttl_ms(0);
        cache.set_max_size(10_000);

        let slack = ENTRY_OVERHEAD + cache.object_max_size();
        for i in 0..40 {
            cache
                .get_resource(&format!("/f{i}.txt"), LookupKind::Static)
                .unwrap();
            assert!(cache.size() <= cache.max_size() + slack);
        }
        assert!(cache.len() < 40);
    }

    #[test]
    fn test_background_process_evicts_stalest_first() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("f{i}.txt")), "x").unwrap();
        }
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_ttl_ms(0);

        for i in 0..10 {
            cache
                .get_resource(&format!("/f{i}.txt"), LookupKind::Static)
                .unwrap();
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(cache.size(), 10 * (ENTRY_OVERHEAD + 1));

        // 90% of 4000 leaves room for 7 entries
        cache.set_max_size(4_000);
        cache.background_process();
        assert_eq!(cache.len(), 7);
        assert!(cache.size() <= 3_600);
        assert!(!cache.shared.entries.contains_key("/f0.txt"));
        assert!(cache.shared.entries.contains_key("/f9.txt"));
    }

    #[test]
    fn test_background_process_spares_fresh_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);
        cache.set_ttl_ms(60_000);

        cache.get_resource("/a.txt", LookupKind::Static).unwrap();
        cache.set_max_size(100);
        cache.background_process();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_population_error_propagates_and_leaves_no_entry() {
        let cache = Cache::new(Arc::new(FailingLookup));
        assert!(cache.get_resource("/a.txt", LookupKind::Static).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_remove_and_clear_release_size() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "aaa").unwrap();
        fs::write(dir.path().join("b.txt"), "bb").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);

        cache.get_resource("/a.txt", LookupKind::Static).unwrap();
        cache.get_resource("/b.txt", LookupKind::Static).unwrap();
        assert_eq!(cache.size(), 2 * ENTRY_OVERHEAD + 5);

        assert!(cache.remove("/a.txt"));
        assert!(!cache.remove("/a.txt"));
        assert_eq!(cache.size(), ENTRY_OVERHEAD + 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_delete_through_cache_evicts_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = cache_over(&lookup);

        let res = cache.get_resource("/a.txt", LookupKind::Static).unwrap();
        assert!(res.delete());
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_concurrent_first_lookups_populate_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "shared").unwrap();
        let lookup = CountingLookup::new(dir.path());
        let cache = Arc::new(cache_over(&lookup));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let res = cache.get_resource("/a.txt", LookupKind::Static).unwrap();
                    res.content().unwrap().unwrap().to_vec()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), b"shared");
        }
        assert_eq!(lookup.lookups(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), ENTRY_OVERHEAD + 6);
    }
}
