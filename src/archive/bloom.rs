//! Probabilistic "could this archive contain the path" pre-check.
//!
//! Two fixed-size bit tables, each fed by its own polynomial hash. A path can
//! only be present if its bit is set in both tables, so a miss in either table
//! proves absence and the index probe can be skipped.
//!
//! With 2048-bit tables and a few hundred entries the false positive rate
//! stays well below 5%.

/// Bits per table.
pub const TABLE_SIZE: usize = 2048;

const WORDS: usize = TABLE_SIZE / 64;
const HASH_PRIME_1: u32 = 31;
const HASH_PRIME_2: u32 = 17;

/// Two-table bloom filter over archive entry names.
#[derive(Clone)]
pub struct ArchiveBloom {
    bits1: [u64; WORDS],
    bits2: [u64; WORDS],
}

impl std::fmt::Debug for ArchiveBloom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ones = |bits: &[u64; WORDS]| bits.iter().map(|w| w.count_ones()).sum::<u32>();
        f.debug_struct("ArchiveBloom")
            .field("bits1_set", &ones(&self.bits1))
            .field("bits2_set", &ones(&self.bits2))
            .finish()
    }
}

impl Default for ArchiveBloom {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBloom {
    /// Create an empty filter.
    pub const fn new() -> Self {
        Self {
            bits1: [0; WORDS],
            bits2: [0; WORDS],
        }
    }

    /// Build a filter from archive entry names.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut bloom = Self::new();
        for name in names {
            bloom.insert(name);
        }
        bloom
    }

    /// Add an entry name. Directory names (trailing `/`) are also added
    /// without the trailing separator, since callers look them up both ways.
    pub fn insert(&mut self, name: &str) {
        let name = name.strip_prefix('/').unwrap_or(name);
        self.set(name);
        if let Some(bare) = name.strip_suffix('/')
            && !bare.is_empty()
        {
            self.set(bare);
        }
    }

    /// Check whether `path` might be present.
    ///
    /// `mount_root` is stripped from the front of `path` first, then any
    /// leading separator. Never returns `false` for an inserted name.
    pub fn might_contain(&self, path: &str, mount_root: &str) -> bool {
        let path = path.strip_prefix(mount_root).unwrap_or(path);
        let path = path.strip_prefix('/').unwrap_or(path);
        let (h1, h2) = (hash(path, HASH_PRIME_1), hash(path, HASH_PRIME_2));
        get(&self.bits1, h1) && get(&self.bits2, h2)
    }

    fn set(&mut self, name: &str) {
        let (h1, h2) = (hash(name, HASH_PRIME_1), hash(name, HASH_PRIME_2));
        self.bits1[h1 / 64] |= 1 << (h1 % 64);
        self.bits2[h2 / 64] |= 1 << (h2 % 64);
    }
}

#[inline]
fn hash(content: &str, prime: u32) -> usize {
    let mut h = prime / 2;
    for b in content.bytes() {
        h = h.wrapping_mul(prime).wrapping_add(u32::from(b));
    }
    h as usize % TABLE_SIZE
}

#[inline]
fn get(bits: &[u64; WORDS], pos: usize) -> bool {
    bits[pos / 64] & (1 << (pos % 64)) != 0
}
