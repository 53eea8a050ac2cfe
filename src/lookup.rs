//! The seam between the cache and whatever resolves resources underneath it.

use crate::error::ResourceResult;
use crate::resource::ResourceRef;

/// Which kind of caller is looking a resource up.
///
/// Some sets only serve one kind of lookup, so the same path can resolve
/// differently depending on the kind. Cached entries remember the kind they
/// were populated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LookupKind {
    /// Ordinary static resource lookup.
    #[default]
    Static,
    /// Class-loader style lookup under `/WEB-INF/classes`.
    ClassLoader,
}

/// Uncached resolution of webapp paths.
///
/// Implemented by the root's set stack; tests substitute counting stand-ins.
pub trait ResourceLookup: Send + Sync {
    /// Resolve a normalized, `/`-prefixed path. Never returns a missing value:
    /// absent resources are reported through [`WebResource::exists`].
    ///
    /// [`WebResource::exists`]: crate::resource::WebResource::exists
    fn lookup(&self, path: &str, kind: LookupKind) -> ResourceResult<ResourceRef>;

    /// Whether the backing content can never change while mounted.
    ///
    /// Cached entries over an immutable backend are never revalidated.
    fn is_immutable(&self) -> bool {
        false
    }
}
