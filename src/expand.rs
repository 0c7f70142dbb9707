//! Archive expansion: repair every image member of a source archive into a
//! destination scope.
//!
//! [`ArchiveExpander::expand`] handles exactly one archive level.  Members
//! that are themselves archives are handed back to the caller as
//! [`NestedArchive`] values (only when nested expansion is enabled);
//! [`expand_with_nested`] is the caller-side loop that opens them and runs the
//! expander again, scoped to each nested archive's parent directory.
//!
//! Member paths are written unchanged under the scope's prefix.  Directory
//! markers and members that are neither images nor archives are dropped.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::archive::{DestinationScope, SourceArchive, SourceEntry, ZipSource};
use crate::classify::{classify_by_extension, media_type_for_path, Classification};
use crate::codec::Codec;
use crate::error::RepairError;
use crate::outcome::{FailurePolicy, Outcome};

/// Deepest archive-in-archive level that is still opened.
pub const MAX_NESTING_DEPTH: usize = 16;

/// An archive member that is itself an archive, read but not yet opened.
#[derive(Debug, Clone)]
pub struct NestedArchive {
    /// Member path inside its parent archive.
    pub path:  String,
    pub bytes: Vec<u8>,
}

/// Result of one expansion level.
#[derive(Debug, Default)]
pub struct Expansion {
    pub outcome: Outcome,
    pub nested:  Vec<NestedArchive>,
}

// ── ArchiveExpander ──────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct ArchiveExpander<'a> {
    codec:          &'a dyn Codec,
    policy:         FailurePolicy,
    collect_nested: bool,
}

impl<'a> ArchiveExpander<'a> {
    pub fn new(codec: &'a dyn Codec, policy: FailurePolicy) -> Self {
        Self { codec, policy, collect_nested: false }
    }

    /// Report archive members for further expansion instead of dropping them.
    pub fn with_nested(mut self, collect_nested: bool) -> Self {
        self.collect_nested = collect_nested;
        self
    }

    pub fn policy(&self) -> FailurePolicy { self.policy }

    /// Expand one archive level.  `origin` names the archive in errors and logs.
    pub fn expand(
        &self,
        origin: &str,
        source: &mut dyn SourceArchive,
        dest:   &mut DestinationScope<'_>,
    ) -> Result<Expansion, RepairError> {
        let entries = source.entries().map_err(|e| RepairError::read(origin, e))?;
        debug!(archive = %origin, entries = entries.len(), prefix = %dest.prefix(), "expanding archive");

        let mut expansion = Expansion::default();
        for entry in entries {
            if entry.is_dir {
                continue;
            }
            let key = format!("{}{}", dest.prefix(), entry.path);
            match classify_by_extension(&entry.path) {
                Classification::Image(_) => {
                    let result = self.repair_member(source, &entry, &key, dest);
                    if result.is_ok() {
                        expansion.outcome.record_written(key.as_str());
                    }
                    expansion.outcome.settle(self.policy, &key, result)?;
                }
                Classification::Archive if self.collect_nested => {
                    match source.read(entry.index) {
                        Ok(bytes) => expansion.nested.push(NestedArchive { path: entry.path, bytes }),
                        Err(e) => {
                            let err = RepairError::read(key.as_str(), e);
                            expansion.outcome.settle(self.policy, &key, Err(err))?;
                        }
                    }
                }
                Classification::Archive => {
                    debug!(path = %key, "dropping nested archive member");
                }
                Classification::Ignored => {
                    trace!(path = %key, "dropping non-image member");
                }
            }
        }
        Ok(expansion)
    }

    fn repair_member(
        &self,
        source: &mut dyn SourceArchive,
        entry:  &SourceEntry,
        key:    &str,
        dest:   &mut DestinationScope<'_>,
    ) -> Result<(), RepairError> {
        let media_type = media_type_for_path(&entry.path);
        let bytes = source.read(entry.index).map_err(|e| RepairError::read(key, e))?;
        let repaired = self.codec
            .repair(&bytes, media_type)
            .map_err(|e| RepairError::decode(key, e))?;
        dest.put(&entry.path, repaired);
        trace!(path = %key, media_type = media_type.mime(), "repaired member");
        Ok(())
    }
}

// ── Nested expansion driver ──────────────────────────────────────────────────

/// Expand `source` into `dest`, then every nested archive it reports.
///
/// A nested archive at `a/b/inner.zip` is expanded into `dest` scoped to
/// `a/b/`.  Archives deeper than [`MAX_NESTING_DEPTH`] are skipped.
pub fn expand_with_nested(
    expander: &ArchiveExpander<'_>,
    origin:   &str,
    source:   &mut dyn SourceArchive,
    dest:     &mut DestinationScope<'_>,
) -> Result<Outcome, RepairError> {
    let first = expander.expand(origin, source, dest)?;
    let mut outcome = first.outcome;

    // (sub-prefix relative to `dest`, depth, archive)
    let mut pending: VecDeque<(String, usize, NestedArchive)> =
        first.nested.into_iter().map(|n| (String::new(), 1, n)).collect();

    while let Some((base, depth, nested)) = pending.pop_front() {
        let key = format!("{}{}{}", dest.prefix(), base, nested.path);
        if depth > MAX_NESTING_DEPTH {
            warn!(path = %key, max = MAX_NESTING_DEPTH, "archive nesting too deep, skipping");
            continue;
        }

        let sub_prefix = format!("{}{}", base, parent_dir(&nested.path));
        let mut src = match ZipSource::from_bytes(nested.bytes) {
            Ok(src) => src,
            Err(e) => {
                let err = RepairError::read(key.as_str(), e);
                outcome.settle(expander.policy(), &key, Err(err))?;
                continue;
            }
        };

        let mut scope = dest.nested(&sub_prefix);
        let expansion = expander.expand(&key, &mut src, &mut scope)?;
        outcome.merge(expansion.outcome);
        pending.extend(
            expansion.nested.into_iter().map(|n| (sub_prefix.clone(), depth + 1, n)),
        );
    }
    Ok(outcome)
}

/// Directory part of a member path, with its trailing slash.
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None    => "",
    }
}
