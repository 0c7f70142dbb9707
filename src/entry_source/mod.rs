//! Entry source capability: files and directories handed to the pipeline.
//!
//! A source yields [`Entry`] values.  File entries materialise into a
//! [`RawItem`] (bytes + name + declared type).  Directory entries hand out a
//! [`DirectoryReader`] whose listing arrives in pages: callers must keep
//! calling [`DirectoryReader::read_entries`] until it returns an empty page.
//!
//! Two implementations ship with the crate:
//! - [`fs`]: the local filesystem, declared types judged from file names.
//! - [`memory`]: an in-memory tree, used by tests and benches.

pub mod fs;
pub mod memory;

use std::io;

use crate::classify::{classify, Classification};

// ── RawItem ──────────────────────────────────────────────────────────────────

/// One materialised input: bytes plus the metadata classification needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub name:          String,
    pub declared_type: Option<String>,
    /// Relative path prefix, empty or ending in `/`.
    pub prefix:        String,
    pub bytes:         Vec<u8>,
}

impl RawItem {
    pub fn new(name: impl Into<String>, declared_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name:          name.into(),
            declared_type: declared_type.map(str::to_owned),
            prefix:        String::new(),
            bytes,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Destination key: prefix followed by name.
    pub fn key(&self) -> String {
        format!("{}{}", self.prefix, self.name)
    }

    pub fn classification(&self) -> Classification {
        classify(&self.name, self.declared_type.as_deref())
    }
}

// ── Entry traits ─────────────────────────────────────────────────────────────

pub enum Entry {
    File(Box<dyn FileEntry>),
    Directory(Box<dyn DirectoryEntry>),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::File(f)      => f.name(),
            Entry::Directory(d) => d.name(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }
}

pub trait FileEntry {
    fn name(&self) -> &str;
    /// Read the file's bytes and declared type.
    fn file(&self) -> io::Result<RawItem>;
}

pub trait DirectoryEntry {
    fn name(&self) -> &str;
    fn create_reader(&self) -> io::Result<Box<dyn DirectoryReader>>;
}

pub trait DirectoryReader {
    /// Next page of children.  An empty page means the listing is exhausted.
    fn read_entries(&mut self) -> io::Result<Vec<Entry>>;
}

/// Drain a reader into one list.
pub fn read_all_entries(reader: &mut dyn DirectoryReader) -> io::Result<Vec<Entry>> {
    let mut all = Vec::new();
    loop {
        let page = reader.read_entries()?;
        if page.is_empty() {
            return Ok(all);
        }
        all.extend(page);
    }
}
