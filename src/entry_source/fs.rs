//! Local filesystem entry source.
//!
//! Directory listings are sorted by file name and delivered in pages of
//! `page_size`.  Symbolic links are skipped, so a walk can never loop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::classify::declared_type_for_name;
use crate::entry_source::{DirectoryEntry, DirectoryReader, Entry, FileEntry, RawItem};

/// Default number of children per directory page.
pub const DEFAULT_PAGE_SIZE: usize = 64;

/// Build an [`Entry`] for `path`, following the link if `path` itself is one.
pub fn entry_for_path<P: AsRef<Path>>(path: P, page_size: usize) -> io::Result<Entry> {
    let path = path.as_ref().to_owned();
    let name = file_name(&path);
    if fs::metadata(&path)?.is_dir() {
        Ok(Entry::Directory(Box::new(FsDirectory { path, name, page_size })))
    } else {
        Ok(Entry::File(Box::new(FsFile { path, name })))
    }
}

/// Read a file into a [`RawItem`], labelling it by its extension.
pub fn read_item<P: AsRef<Path>>(path: P) -> io::Result<RawItem> {
    let path = path.as_ref();
    let name = file_name(path);
    let bytes = fs::read(path)?;
    Ok(RawItem::new(name.clone(), declared_type_for_name(&name), bytes))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

// ── FsFile ───────────────────────────────────────────────────────────────────

pub struct FsFile {
    path: PathBuf,
    name: String,
}

impl FileEntry for FsFile {
    fn name(&self) -> &str { &self.name }

    fn file(&self) -> io::Result<RawItem> {
        read_item(&self.path)
    }
}

// ── FsDirectory ──────────────────────────────────────────────────────────────

pub struct FsDirectory {
    path:      PathBuf,
    name:      String,
    page_size: usize,
}

impl FsDirectory {
    pub fn new<P: AsRef<Path>>(path: P, page_size: usize) -> Self {
        let path = path.as_ref().to_owned();
        let name = file_name(&path);
        Self { path, name, page_size }
    }
}

impl DirectoryEntry for FsDirectory {
    fn name(&self) -> &str { &self.name }

    fn create_reader(&self) -> io::Result<Box<dyn DirectoryReader>> {
        let mut children: Vec<(String, PathBuf, bool)> = Vec::new();
        for dirent in fs::read_dir(&self.path)? {
            let dirent = dirent?;
            let file_type = dirent.file_type()?;
            let name = dirent.file_name().to_string_lossy().into_owned();
            if file_type.is_symlink() {
                debug!(path = %dirent.path().display(), "not following symlink");
                continue;
            }
            children.push((name, dirent.path(), file_type.is_dir()));
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Box::new(FsReader {
            pending:   children.into_iter(),
            page_size: self.page_size.max(1),
        }))
    }
}

struct FsReader {
    pending:   std::vec::IntoIter<(String, PathBuf, bool)>,
    page_size: usize,
}

impl DirectoryReader for FsReader {
    fn read_entries(&mut self) -> io::Result<Vec<Entry>> {
        let page_size = self.page_size;
        Ok(self.pending
            .by_ref()
            .take(page_size)
            .map(|(name, path, is_dir)| {
                if is_dir {
                    Entry::Directory(Box::new(FsDirectory { path, name, page_size }))
                } else {
                    Entry::File(Box::new(FsFile { path, name }))
                }
            })
            .collect())
    }
}
