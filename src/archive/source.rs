//! Reading archives on disk and archives nested inside them.
//!
//! ```text
//! ArchiveSource::File(app.jar)
//! └── central directory ──► random access by name
//!
//! ArchiveSource::Nested { outer: app.war, entry: lib/inner.jar }
//! └── app.war central directory ──► lib/inner.jar (compressed stream)
//!     └── local headers, one forward pass ──► inner entries
//! ```
//!
//! Every scan and every read opens the outer file and drops it before
//! returning, so open handles are bounded by in-flight reads.

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use zip::ZipArchive;
use zip::read::read_zipfile_from_stream;
use zip::result::ZipError;

use super::index::EntryMeta;
use crate::error::{ResourceError, ResourceResult};
use crate::resource::{EntryOpener, ResourceStream, to_utc};

/// Location of an archive: a file on disk, or an entry of another archive.
#[derive(Debug)]
pub enum ArchiveSource {
    /// An archive file on disk.
    File(PathBuf),
    /// An archive stored as an entry of an outer archive.
    Nested {
        /// Outer archive on disk.
        outer: PathBuf,
        /// Entry name of the inner archive inside `outer`.
        entry: String,
        /// Set once the inner archive turned out to need buffering.
        buffered: AtomicBool,
    },
}

impl ArchiveSource {
    /// Source for an archive file on disk.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Source for an archive nested inside `outer` at `entry`.
    pub fn nested(outer: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        let entry = entry.into();
        Self::Nested {
            outer: outer.into(),
            entry: entry.trim_start_matches('/').to_string(),
            buffered: AtomicBool::new(false),
        }
    }

    /// Archive file on disk (the outer archive for nested sources).
    pub fn location(&self) -> &Path {
        match self {
            Self::File(path) | Self::Nested { outer: path, .. } => path,
        }
    }

    /// Modification time of the archive file on disk.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        fs::metadata(self.location()).ok()?.modified().ok().map(to_utc)
    }

    /// List all entries.
    pub fn scan(&self) -> ResourceResult<Vec<EntryMeta>> {
        match self {
            Self::File(path) => scan_archive(&mut open_archive(path)?, path),
            Self::Nested {
                outer,
                entry,
                buffered,
            } => {
                if !buffered.load(Ordering::Relaxed) {
                    match scan_stream(outer, entry) {
                        Err(ResourceError::Archive {
                            source: ZipError::UnsupportedArchive(reason),
                            ..
                        }) => {
                            tracing::debug!(
                                archive = %outer.display(),
                                entry = %entry,
                                reason,
                                "nested archive cannot be streamed, buffering it in memory"
                            );
                            buffered.store(true, Ordering::Relaxed);
                        }
                        other => return other,
                    }
                }
                scan_archive(&mut buffer_nested(outer, entry)?, outer)
            }
        }
    }

    /// Read the full content of entry `name`, `None` if it is not present.
    pub fn read_entry(&self, name: &str) -> ResourceResult<Option<Vec<u8>>> {
        match self {
            Self::File(path) => read_from_archive(&mut open_archive(path)?, name, path),
            Self::Nested {
                outer,
                entry,
                buffered,
            } => {
                if buffered.load(Ordering::Relaxed) {
                    read_from_archive(&mut buffer_nested(outer, entry)?, name, outer)
                } else {
                    read_stream(outer, entry, name)
                }
            }
        }
    }
}

impl EntryOpener for ArchiveSource {
    fn open_entry(&self, name: &str) -> ResourceResult<ResourceStream> {
        match self.read_entry(name)? {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes))),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{name} is no longer present in {}", self.location().display()),
            )
            .into()),
        }
    }

    fn location(&self) -> &Path {
        ArchiveSource::location(self)
    }
}

// =============================================================================
// Random Access (central directory)
// =============================================================================

fn open_archive(path: &Path) -> ResourceResult<ZipArchive<BufReader<File>>> {
    let file = File::open(path)?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| ResourceError::archive(path, e))
}

fn scan_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
) -> ResourceResult<Vec<EntryMeta>> {
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive
            .by_index_raw(i)
            .map_err(|e| ResourceError::archive(path, e))?;
        entries.push(entry_meta(
            file.name(),
            file.is_dir(),
            file.size(),
            file.last_modified(),
        ));
    }
    Ok(entries)
}

fn read_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    path: &Path,
) -> ResourceResult<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(ResourceError::archive(path, e)),
    }
}

// =============================================================================
// Forward-only (nested archives)
// =============================================================================

fn scan_stream(outer: &Path, entry: &str) -> ResourceResult<Vec<EntryMeta>> {
    let mut archive = open_archive(outer)?;
    let mut inner = archive
        .by_name(entry)
        .map_err(|e| ResourceError::archive(outer, e))?;

    let mut entries = Vec::new();
    while let Some(file) =
        read_zipfile_from_stream(&mut inner).map_err(|e| ResourceError::archive(outer, e))?
    {
        entries.push(entry_meta(
            file.name(),
            file.is_dir(),
            file.size(),
            file.last_modified(),
        ));
    }
    Ok(entries)
}

fn read_stream(outer: &Path, entry: &str, name: &str) -> ResourceResult<Option<Vec<u8>>> {
    let mut archive = open_archive(outer)?;
    let mut inner = archive
        .by_name(entry)
        .map_err(|e| ResourceError::archive(outer, e))?;

    while let Some(mut file) =
        read_zipfile_from_stream(&mut inner).map_err(|e| ResourceError::archive(outer, e))?
    {
        if file.name() == name {
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            return Ok(Some(buf));
        }
    }
    Ok(None)
}

/// Load a nested archive into memory so its central directory can be used.
fn buffer_nested(outer: &Path, entry: &str) -> ResourceResult<ZipArchive<Cursor<Vec<u8>>>> {
    let mut archive = open_archive(outer)?;
    let mut inner = archive
        .by_name(entry)
        .map_err(|e| ResourceError::archive(outer, e))?;
    let mut buf = Vec::with_capacity(inner.size() as usize);
    inner.read_to_end(&mut buf)?;
    ZipArchive::new(Cursor::new(buf)).map_err(|e| ResourceError::archive(outer, e))
}

// =============================================================================
// Helpers
// =============================================================================

fn entry_meta(name: &str, is_dir: bool, size: u64, modified: Option<zip::DateTime>) -> EntryMeta {
    let modified = modified.and_then(zip_time);
    if is_dir {
        EntryMeta::dir(name, modified)
    } else {
        EntryMeta::file(name, size, modified)
    }
}

fn zip_time(time: zip::DateTime) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
    )?
    .and_hms_opt(
        u32::from(time.hour()),
        u32::from(time.minute()),
        u32::from(time.second()),
    )
    .map(|naive| naive.and_utc())
}
