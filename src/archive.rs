//! Archive capability: reading source zips and building destination zips.
//!
//! ```no_run
//! use landafix::archive::{DestinationArchive, PackOptions, SourceArchive, ZipSource};
//!
//! // Write
//! let mut dest = DestinationArchive::new();
//! dest.put("photos/a.png", b"...".to_vec());
//! let bytes = dest.finalize(&PackOptions::default())?;
//!
//! // Read
//! let mut src = ZipSource::from_bytes(bytes)?;
//! for entry in src.entries()? {
//!     println!("{} dir={}", entry.path, entry.is_dir);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

// ── PackOptions ──────────────────────────────────────────────────────────────

/// Entry compression for serialized destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Stored,
    Deflated,
}

/// Configuration for [`DestinationArchive::finalize`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub compression: Compression,
    /// Codec-specific level; `None` uses the zip crate's default.
    pub level:       Option<i64>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Deflated,
            level:       None,
        }
    }
}

impl PackOptions {
    fn file_options(&self) -> SimpleFileOptions {
        let method = match self.compression {
            Compression::Stored   => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        };
        let opts = SimpleFileOptions::default().compression_method(method);
        match self.compression {
            Compression::Stored   => opts,
            Compression::Deflated => opts.compression_level(self.level),
        }
    }
}

// ── Read side ────────────────────────────────────────────────────────────────

/// Upper bound on the buffer reserved up front for one member.
const READ_PREALLOC_LIMIT: usize = 1 << 20;

/// One member of a source archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub index:  usize,
    pub path:   String,
    pub is_dir: bool,
}

/// Read access to an opened archive.
pub trait SourceArchive {
    /// Every member, in archive order, directory markers included.
    fn entries(&mut self) -> Result<Vec<SourceEntry>, ArchiveError>;
    /// Uncompressed bytes of the member at `index`.
    fn read(&mut self, index: usize) -> Result<Vec<u8>, ArchiveError>;
}

/// In-memory zip reader.
pub struct ZipSource {
    inner: ZipArchive<Cursor<Vec<u8>>>,
}

impl ZipSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        Ok(Self { inner: ZipArchive::new(Cursor::new(bytes))? })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn len(&self) -> usize { self.inner.len() }

    pub fn is_empty(&self) -> bool { self.inner.len() == 0 }
}

impl SourceArchive for ZipSource {
    fn entries(&mut self) -> Result<Vec<SourceEntry>, ArchiveError> {
        let mut entries = Vec::with_capacity(self.inner.len());
        for index in 0..self.inner.len() {
            let file = self.inner.by_index_raw(index)?;
            entries.push(SourceEntry {
                index,
                path:   file.name().to_owned(),
                is_dir: file.is_dir(),
            });
        }
        Ok(entries)
    }

    fn read(&mut self, index: usize) -> Result<Vec<u8>, ArchiveError> {
        let mut file = self.inner.by_index(index)?;
        // The header's size is untrusted; let `read_to_end` grow past the cap.
        let claimed = usize::try_from(file.size()).unwrap_or(usize::MAX);
        let mut out = Vec::with_capacity(claimed.min(READ_PREALLOC_LIMIT));
        file.read_to_end(&mut out)?;
        Ok(out)
    }
}

// ── Write side ───────────────────────────────────────────────────────────────

/// The in-progress output of one orchestration run: path key → repaired bytes.
///
/// Keys are forward-slash separated and unique.  Writing an existing key
/// replaces its bytes (last write wins).  Iteration order is key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl DestinationArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every non-directory member of an existing zip.
    pub fn open(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        let mut src = ZipSource::from_bytes(bytes)?;
        let mut dest = Self::new();
        for entry in src.entries()? {
            if entry.is_dir {
                continue;
            }
            let data = src.read(entry.index)?;
            dest.entries.insert(entry.path, data);
        }
        Ok(dest)
    }

    /// Insert `data` under `path`.  Returns `true` when an earlier entry was replaced.
    pub fn put(&mut self, path: impl Into<String>, data: Vec<u8>) -> bool {
        let path = path.into();
        let replaced = self.entries.insert(path.clone(), data).is_some();
        if replaced {
            debug!(path = %path, "destination key written twice, keeping the last write");
        }
        replaced
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn contains(&self, path: &str) -> bool { self.entries.contains_key(path) }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// A view that writes every key under `prefix`.
    pub fn scope(&mut self, prefix: impl Into<String>) -> DestinationScope<'_> {
        DestinationScope { dest: self, prefix: prefix.into() }
    }

    /// Serialize to zip bytes.
    pub fn finalize(&self, opts: &PackOptions) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let file_opts = opts.file_options();
        for (path, data) in &self.entries {
            writer.start_file(path.as_str(), file_opts)?;
            writer.write_all(data)?;
        }
        Ok(writer.finish()?.into_inner())
    }
}

// ── DestinationScope ─────────────────────────────────────────────────────────

/// Exclusive, prefix-scoped write access to a [`DestinationArchive`].
///
/// The prefix is either empty or ends in `/`.
pub struct DestinationScope<'a> {
    dest:   &'a mut DestinationArchive,
    prefix: String,
}

impl DestinationScope<'_> {
    pub fn prefix(&self) -> &str { &self.prefix }

    /// Write `data` under `prefix + path`.
    pub fn put(&mut self, path: &str, data: Vec<u8>) -> bool {
        let key = format!("{}{}", self.prefix, path);
        self.dest.put(key, data)
    }

    /// Entry count of the whole destination, not just this scope.
    pub fn len(&self) -> usize { self.dest.len() }

    pub fn is_empty(&self) -> bool { self.dest.is_empty() }

    /// A narrower view under `self.prefix + sub_prefix`.
    pub fn nested(&mut self, sub_prefix: &str) -> DestinationScope<'_> {
        let prefix = format!("{}{}", self.prefix, sub_prefix);
        DestinationScope { dest: &mut *self.dest, prefix }
    }
}
