//! Error type for resource lookups and root management.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors raised by resource sets, the root and the cache.
///
/// A resource that simply does not exist is never an error: lookups return a
/// non-existent resource instead. These variants cover caller contract
/// violations and genuine I/O or archive failures.
///
/// # Example
///
/// ```ignore
/// match root.get_resource("index.html") {
///     Ok(resource) => { /* ... */ }
///     Err(ResourceError::InvalidPath { path }) => eprintln!("bad path: {path}"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The path was empty or not `/`-prefixed.
    #[error("invalid resource path: {path:?}")]
    InvalidPath {
        /// The offending path.
        path: String,
    },

    /// The root has not been started, or has been stopped.
    #[error("resource root is not started")]
    NotStarted,

    /// No main resource set was configured.
    #[error("no main resource set configured")]
    MissingMain,

    /// More than one main resource set was configured.
    #[error("only one main resource set may be configured")]
    DuplicateMain,

    /// The base location of a set is missing or of the wrong type.
    #[error("invalid base for {kind} set: {}", path.display())]
    InvalidBase {
        /// Kind of set being created.
        kind: &'static str,
        /// The base location.
        path: PathBuf,
    },

    /// The archive container could not be read.
    #[error("archive error in {}: {source}", path.display())]
    Archive {
        /// Archive on disk (the outer archive for nested sets).
        path: PathBuf,
        /// Underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Configuration could not be parsed.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResourceError {
    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Wrap an archive error for the given archive location.
    pub fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    /// Check whether this error is a caller contract violation rather than
    /// a failure of the backing store.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidPath { .. } | Self::NotStarted)
    }
}
