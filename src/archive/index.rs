//! Name → entry index for one archive.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use super::bloom::ArchiveBloom;

/// Metadata for one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    /// Entry name inside the archive. Directories end with `/`.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Modification time recorded in the archive.
    pub modified: Option<DateTime<Utc>>,
}

impl EntryMeta {
    /// A file entry.
    pub fn file(name: impl Into<String>, size: u64, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
            modified,
        }
    }

    /// A directory entry. A trailing `/` is added when missing.
    pub fn dir(name: impl Into<String>, modified: Option<DateTime<Utc>>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            name,
            is_dir: true,
            size: 0,
            modified,
        }
    }
}

/// Immutable index of an archive's entries, built once per mounted archive.
///
/// Parent directories that the archive does not list explicitly are added as
/// synthetic directory entries, so `a/b/c.txt` alone makes `a/` and `a/b/`
/// resolvable.
#[derive(Debug)]
pub struct ArchiveIndex {
    entries: FxHashMap<String, EntryMeta>,
    bloom: Option<ArchiveBloom>,
}

impl ArchiveIndex {
    /// Build an index from scanned entries.
    ///
    /// `implied_modified` is used as the timestamp of synthetic directories.
    pub fn build(
        scanned: Vec<EntryMeta>,
        implied_modified: Option<DateTime<Utc>>,
        with_bloom: bool,
    ) -> Self {
        let mut entries: FxHashMap<String, EntryMeta> =
            FxHashMap::with_capacity_and_hasher(scanned.len(), Default::default());

        for entry in scanned {
            let name = entry.name.trim_start_matches('/');
            for (i, _) in name.match_indices('/') {
                let parent = &name[..=i];
                if parent.len() < name.len() && !entries.contains_key(parent) {
                    entries.insert(parent.to_string(), EntryMeta::dir(parent, implied_modified));
                }
            }
            // Explicit entries replace synthetic ones
            entries.insert(name.to_string(), entry);
        }

        let bloom = with_bloom.then(|| ArchiveBloom::from_names(entries.keys().map(String::as_str)));
        Self { entries, bloom }
    }

    /// Exact lookup by entry name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&EntryMeta> {
        self.entries.get(name)
    }

    /// Lookup tolerating directories requested without their trailing `/`.
    pub fn lookup(&self, name: &str) -> Option<&EntryMeta> {
        self.entries.get(name).or_else(|| {
            if name.ends_with('/') {
                None
            } else {
                self.entries.get(&format!("{name}/"))
            }
        })
    }

    /// Immediate children of the directory `prefix` (empty or ending in `/`),
    /// sorted by name. Each item is `(child name, is_dir)`.
    pub fn children(&self, prefix: &str) -> Vec<(&str, bool)> {
        let mut children: Vec<(&str, bool)> = self
            .entries
            .iter()
            .filter_map(|(key, meta)| {
                let rest = key.strip_prefix(prefix)?;
                let rest = rest.strip_suffix('/').unwrap_or(rest);
                (!rest.is_empty() && !rest.contains('/')).then_some((rest, meta.is_dir))
            })
            .collect();
        children.sort_unstable();
        children
    }

    /// The bloom pre-check, when enabled.
    #[inline]
    pub fn bloom(&self) -> Option<&ArchiveBloom> {
        self.bloom.as_ref()
    }

    /// Number of indexed entries, including synthetic directories.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
