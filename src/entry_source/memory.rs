//! In-memory entry tree.
//!
//! ```
//! use landafix::entry_source::memory::MemoryEntry;
//!
//! let tree = MemoryEntry::dir("root", vec![
//!     MemoryEntry::file("a.png", Some("image/png"), b"...".to_vec()),
//!     MemoryEntry::dir("sub", vec![]),
//! ]);
//! assert_eq!(tree.name(), "root");
//! ```

use std::io;

use crate::entry_source::{DirectoryEntry, DirectoryReader, Entry, FileEntry, RawItem};

#[derive(Debug, Clone)]
pub enum MemoryEntry {
    File(MemoryFile),
    Directory(MemoryDirectory),
}

#[derive(Debug, Clone)]
pub struct MemoryFile {
    name:          String,
    declared_type: Option<String>,
    /// `None` makes every read fail.
    bytes:         Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    name:      String,
    children:  Vec<MemoryEntry>,
    page_size: usize,
}

impl MemoryEntry {
    pub fn file(name: impl Into<String>, declared_type: Option<&str>, bytes: Vec<u8>) -> Self {
        MemoryEntry::File(MemoryFile {
            name:          name.into(),
            declared_type: declared_type.map(str::to_owned),
            bytes:         Some(bytes),
        })
    }

    /// A file whose contents cannot be read.
    pub fn unreadable(name: impl Into<String>, declared_type: Option<&str>) -> Self {
        MemoryEntry::File(MemoryFile {
            name:          name.into(),
            declared_type: declared_type.map(str::to_owned),
            bytes:         None,
        })
    }

    pub fn dir(name: impl Into<String>, children: Vec<MemoryEntry>) -> Self {
        MemoryEntry::Directory(MemoryDirectory {
            name: name.into(),
            children,
            page_size: usize::MAX,
        })
    }

    /// Deliver this directory's listing in pages of `page_size`.
    /// No effect on files.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        if let MemoryEntry::Directory(d) = &mut self {
            d.page_size = page_size.max(1);
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            MemoryEntry::File(f)      => &f.name,
            MemoryEntry::Directory(d) => &d.name,
        }
    }

    pub fn into_entry(self) -> Entry {
        match self {
            MemoryEntry::File(f)      => Entry::File(Box::new(f)),
            MemoryEntry::Directory(d) => Entry::Directory(Box::new(d)),
        }
    }
}

impl FileEntry for MemoryFile {
    fn name(&self) -> &str { &self.name }

    fn file(&self) -> io::Result<RawItem> {
        let bytes = self.bytes.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::PermissionDenied, format!("cannot read {}", self.name))
        })?;
        Ok(RawItem::new(self.name.clone(), self.declared_type.as_deref(), bytes))
    }
}

impl DirectoryEntry for MemoryDirectory {
    fn name(&self) -> &str { &self.name }

    fn create_reader(&self) -> io::Result<Box<dyn DirectoryReader>> {
        Ok(Box::new(MemoryReader {
            pending:   self.children.clone().into_iter(),
            page_size: self.page_size,
        }))
    }
}

struct MemoryReader {
    pending:   std::vec::IntoIter<MemoryEntry>,
    page_size: usize,
}

impl DirectoryReader for MemoryReader {
    fn read_entries(&mut self) -> io::Result<Vec<Entry>> {
        Ok(self.pending
            .by_ref()
            .take(self.page_size)
            .map(MemoryEntry::into_entry)
            .collect())
    }
}
