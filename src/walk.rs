//! Directory tree traversal.
//!
//! The walk uses an explicit stack of `(prefix, entry)` pairs, so depth is
//! bounded by memory rather than by the call stack.  Prefixes are built by
//! plain concatenation: `prefix + dir_name + "/"`.  No `.`/`..` handling and
//! no cycle detection happen here; the entry source must yield an acyclic
//! tree (the filesystem source does not follow symlinks).

use tracing::{debug, trace};

use crate::archive::{DestinationArchive, ZipSource};
use crate::classify::Classification;
use crate::codec::Codec;
use crate::entry_source::{read_all_entries, DirectoryEntry, Entry, FileEntry};
use crate::error::RepairError;
use crate::expand::{expand_with_nested, ArchiveExpander};
use crate::outcome::Outcome;

pub struct TreeWalker<'a> {
    codec:    &'a dyn Codec,
    expander: ArchiveExpander<'a>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(codec: &'a dyn Codec, expander: ArchiveExpander<'a>) -> Self {
        Self { codec, expander }
    }

    /// Walk `entry` into `dest` under `prefix`.
    ///
    /// A file lands at `prefix + name`; a directory's children are walked
    /// under `prefix + name + "/"`.
    pub fn walk(
        &self,
        entry:  Entry,
        dest:   &mut DestinationArchive,
        prefix: &str,
    ) -> Result<Outcome, RepairError> {
        let mut outcome = Outcome::new();
        let mut stack = vec![(prefix.to_owned(), entry)];
        self.drain(&mut stack, dest, &mut outcome)?;
        Ok(outcome)
    }

    /// Walk the contents of `root` with an empty prefix; the root's own name
    /// is not part of any key.
    pub fn walk_root(
        &self,
        root: &dyn DirectoryEntry,
        dest: &mut DestinationArchive,
    ) -> Result<Outcome, RepairError> {
        let mut outcome = Outcome::new();
        let mut stack = Vec::new();
        self.push_children(root, String::new(), &mut stack, &mut outcome)?;
        self.drain(&mut stack, dest, &mut outcome)?;
        Ok(outcome)
    }

    fn drain(
        &self,
        stack:   &mut Vec<(String, Entry)>,
        dest:    &mut DestinationArchive,
        outcome: &mut Outcome,
    ) -> Result<(), RepairError> {
        while let Some((prefix, entry)) = stack.pop() {
            match entry {
                Entry::File(file) => {
                    let key = format!("{}{}", prefix, file.name());
                    let result = self.visit_file(file.as_ref(), &prefix, dest, outcome);
                    outcome.settle(self.expander.policy(), &key, result)?;
                }
                Entry::Directory(dir) => {
                    let child_prefix = format!("{}{}/", prefix, dir.name());
                    self.push_children(dir.as_ref(), child_prefix, stack, outcome)?;
                }
            }
        }
        Ok(())
    }

    /// Read the whole (possibly paginated) listing and queue it in order.
    fn push_children(
        &self,
        dir:     &dyn DirectoryEntry,
        prefix:  String,
        stack:   &mut Vec<(String, Entry)>,
        outcome: &mut Outcome,
    ) -> Result<(), RepairError> {
        let listing = dir.create_reader().and_then(|mut reader| read_all_entries(reader.as_mut()));
        match listing {
            Ok(children) => {
                debug!(dir = %prefix, children = children.len(), "entering directory");
                stack.extend(children.into_iter().rev().map(|child| (prefix.clone(), child)));
                Ok(())
            }
            Err(e) => {
                let err = RepairError::read(prefix.as_str(), e);
                outcome.settle(self.expander.policy(), &prefix, Err(err))
            }
        }
    }

    fn visit_file(
        &self,
        file:    &dyn FileEntry,
        prefix:  &str,
        dest:    &mut DestinationArchive,
        outcome: &mut Outcome,
    ) -> Result<(), RepairError> {
        let key = format!("{}{}", prefix, file.name());
        let item = file
            .file()
            .map_err(|e| RepairError::read(key.as_str(), e))?
            .with_prefix(prefix);

        match item.classification() {
            Classification::Archive => {
                let mut src = ZipSource::from_bytes(item.bytes)
                    .map_err(|e| RepairError::read(key.as_str(), e))?;
                let expanded = expand_with_nested(&self.expander, &key, &mut src, &mut dest.scope(prefix))?;
                outcome.merge(expanded);
            }
            Classification::Image(media_type) => {
                let repaired = self.codec
                    .repair(&item.bytes, media_type)
                    .map_err(|e| RepairError::decode(key.as_str(), e))?;
                dest.put(item.key(), repaired);
                outcome.record_written(key);
            }
            Classification::Ignored => {
                trace!(path = %key, "ignoring file");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MediaType;
    use crate::codec::CodecError;
    use crate::entry_source::memory::MemoryEntry;
    use crate::outcome::FailurePolicy;

    struct Passthrough;
    impl Codec for Passthrough {
        fn repair(&self, bytes: &[u8], _: MediaType) -> Result<Vec<u8>, CodecError> {
            Ok(bytes.to_vec())
        }
    }

    fn png(name: &str) -> MemoryEntry {
        MemoryEntry::file(name, Some("image/png"), b"px".to_vec())
    }

    #[test]
    fn walk_prefixes_with_directory_names() {
        let tree = MemoryEntry::dir("root", vec![
            png("a.png"),
            MemoryEntry::dir("sub", vec![png("b.png")]),
        ]);
        let codec = Passthrough;
        let walker = TreeWalker::new(&codec, ArchiveExpander::new(&codec, FailurePolicy::Skip));

        let mut dest = DestinationArchive::new();
        walker.walk(tree.clone().into_entry(), &mut dest, "").unwrap();
        assert_eq!(dest.paths().collect::<Vec<_>>(), vec!["root/a.png", "root/sub/b.png"]);

        let mut dest = DestinationArchive::new();
        walker.walk(tree.into_entry(), &mut dest, "batch/").unwrap();
        assert!(dest.contains("batch/root/sub/b.png"));
    }

    #[test]
    fn walk_of_a_file_uses_prefix_and_name() {
        let codec = Passthrough;
        let walker = TreeWalker::new(&codec, ArchiveExpander::new(&codec, FailurePolicy::Skip));
        let mut dest = DestinationArchive::new();
        let outcome = walker.walk(png("x.png").into_entry(), &mut dest, "p/").unwrap();
        assert_eq!(outcome.written().collect::<Vec<_>>(), vec!["p/x.png"]);
    }

    #[test]
    fn deep_trees_do_not_recurse() {
        let mut tree = png("leaf.png");
        for depth in 0..1_000 {
            tree = MemoryEntry::dir(format!("d{depth}"), vec![tree]);
        }
        let codec = Passthrough;
        let walker = TreeWalker::new(&codec, ArchiveExpander::new(&codec, FailurePolicy::Skip));
        let mut dest = DestinationArchive::new();
        walker.walk(tree.into_entry(), &mut dest, "").unwrap();
        assert_eq!(dest.len(), 1);
        assert!(dest.paths().next().unwrap().ends_with("d0/leaf.png"));
    }

    #[test]
    fn unreadable_file_respects_policy() {
        let tree = MemoryEntry::dir("root", vec![
            MemoryEntry::unreadable("locked.png", Some("image/png")),
            png("ok.png"),
        ]);
        let codec = Passthrough;

        let skip = TreeWalker::new(&codec, ArchiveExpander::new(&codec, FailurePolicy::Skip));
        let mut dest = DestinationArchive::new();
        let outcome = skip.walk_root(as_dir(tree.clone()).as_ref(), &mut dest).unwrap();
        assert_eq!(dest.paths().collect::<Vec<_>>(), vec!["ok.png"]);
        assert_eq!(outcome.failures().next().unwrap().0, "locked.png");

        let abort = TreeWalker::new(&codec, ArchiveExpander::new(&codec, FailurePolicy::Abort));
        let mut dest = DestinationArchive::new();
        let err = abort.walk_root(as_dir(tree).as_ref(), &mut dest).unwrap_err();
        assert!(matches!(err, RepairError::Read { .. }));
    }

    fn as_dir(entry: MemoryEntry) -> Box<dyn DirectoryEntry> {
        match entry.into_entry() {
            Entry::Directory(d) => d,
            Entry::File(_)      => panic!("not a directory"),
        }
    }
}
