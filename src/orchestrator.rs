//! Batch entry point.
//!
//! [`BatchOrchestrator::process`] picks one [`OutputMode`] up front:
//!
//! | Inputs | Destination supplied | Mode |
//! |---|---|---|
//! | one file, image or ignored | no | `SingleBlob` |
//! | one file, archive | no | `NewArchiveFromSingleInput` |
//! | anything else (several inputs, a directory) | either | `AccumulateIntoDestination` |
//! | anything | yes | `AccumulateIntoDestination` |
//!
//! A lone ignored file produces [`Output::Skipped`] rather than an error.

use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::archive::{DestinationArchive, SourceArchive, ZipSource};
use crate::classify::{classify_by_extension, Classification, MediaType};
use crate::codec::{Codec, RasterCodec};
use crate::config::RepairConfig;
use crate::entry_source::fs::entry_for_path;
use crate::entry_source::{DirectoryEntry, Entry, RawItem};
use crate::error::RepairError;
use crate::expand::{expand_with_nested, ArchiveExpander};
use crate::outcome::Outcome;
use crate::walk::TreeWalker;

// ── Inputs ───────────────────────────────────────────────────────────────────

/// One top-level input.
pub enum InputItem {
    File(RawItem),
    /// A directory tree, walked with its own name left out of the keys.
    Directory(Box<dyn DirectoryEntry>),
}

impl InputItem {
    /// Read a file, or wrap a directory for walking.
    pub fn from_path<P: AsRef<Path>>(path: P, page_size: usize) -> io::Result<Self> {
        match entry_for_path(path, page_size)? {
            Entry::File(file)     => Ok(InputItem::File(file.file()?)),
            Entry::Directory(dir) => Ok(InputItem::Directory(dir)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InputItem::File(item)     => &item.name,
            InputItem::Directory(dir) => dir.name(),
        }
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    SingleBlob,
    NewArchiveFromSingleInput,
    AccumulateIntoDestination,
}

impl OutputMode {
    pub fn decide(inputs: &[InputItem], has_destination: bool) -> Self {
        match inputs {
            [InputItem::File(item)] if !has_destination => match item.classification() {
                Classification::Archive => OutputMode::NewArchiveFromSingleInput,
                _                       => OutputMode::SingleBlob,
            },
            _ => OutputMode::AccumulateIntoDestination,
        }
    }
}

/// A lone repaired image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedBlob {
    pub name:       String,
    pub media_type: MediaType,
    pub bytes:      Vec<u8>,
}

#[derive(Debug)]
pub enum Output {
    Blob(RepairedBlob),
    /// A destination created by this call.
    Archive(DestinationArchive),
    /// Entries were added to the caller's destination.
    Appended { added: usize },
    /// A lone input that is neither image nor archive.
    Skipped,
}

#[derive(Debug)]
pub struct Report {
    pub mode:    OutputMode,
    pub output:  Output,
    pub outcome: Outcome,
}

// ── BatchOrchestrator ────────────────────────────────────────────────────────

pub struct BatchOrchestrator {
    codec:  Arc<dyn Codec>,
    config: RepairConfig,
}

impl BatchOrchestrator {
    pub fn new(codec: Arc<dyn Codec>, config: RepairConfig) -> Self {
        Self { codec, config }
    }

    /// Orchestrator backed by [`RasterCodec`] at the configured JPEG quality.
    pub fn with_raster_codec(config: RepairConfig) -> Self {
        let codec = Arc::new(RasterCodec::new(config.jpeg_quality));
        Self::new(codec, config)
    }

    fn expander(&self) -> ArchiveExpander<'_> {
        ArchiveExpander::new(self.codec.as_ref(), self.config.failure_policy)
            .with_nested(self.config.nested_archives)
    }

    /// Run one batch.
    ///
    /// With `destination` supplied, every input is accumulated into it and the
    /// report carries [`Output::Appended`].  Item failures follow the
    /// configured failure policy.
    pub fn process(
        &self,
        mut inputs:  Vec<InputItem>,
        destination: Option<&mut DestinationArchive>,
    ) -> Result<Report, RepairError> {
        let mode = OutputMode::decide(&inputs, destination.is_some());
        info!(inputs = inputs.len(), ?mode, policy = ?self.config.failure_policy, "processing batch");

        if mode != OutputMode::AccumulateIntoDestination {
            if let Some(InputItem::File(item)) = inputs.pop() {
                return self.process_single(item);
            }
        }

        match destination {
            Some(dest) => {
                let before = dest.len();
                let outcome = self.accumulate(inputs, dest)?;
                Ok(Report { mode, output: Output::Appended { added: dest.len() - before }, outcome })
            }
            None => {
                let mut dest = DestinationArchive::new();
                let outcome = self.accumulate(inputs, &mut dest)?;
                Ok(Report { mode, output: Output::Archive(dest), outcome })
            }
        }
    }

    fn process_single(&self, item: RawItem) -> Result<Report, RepairError> {
        match item.classification() {
            Classification::Archive => self.single_archive(item),
            Classification::Image(media_type) => {
                let bytes = self.codec
                    .repair(&item.bytes, media_type)
                    .map_err(|e| RepairError::decode(item.name.as_str(), e))?;
                let mut outcome = Outcome::new();
                outcome.record_written(item.name.as_str());
                let blob = RepairedBlob { name: item.name, media_type, bytes };
                Ok(Report { mode: OutputMode::SingleBlob, output: Output::Blob(blob), outcome })
            }
            Classification::Ignored => {
                info!(name = %item.name, "input is neither an image nor an archive, nothing to do");
                Ok(Report { mode: OutputMode::SingleBlob, output: Output::Skipped, outcome: Outcome::new() })
            }
        }
    }

    fn single_archive(&self, item: RawItem) -> Result<Report, RepairError> {
        let name = item.name;
        let mut src = ZipSource::from_bytes(item.bytes).map_err(|e| RepairError::read(name.as_str(), e))?;
        let entries = src.entries().map_err(|e| RepairError::read(name.as_str(), e))?;

        let nested = self.config.nested_archives;
        let has_candidates = entries.iter().filter(|e| !e.is_dir).any(|e| {
            match classify_by_extension(&e.path) {
                Classification::Image(_) => true,
                Classification::Archive  => nested,
                Classification::Ignored  => false,
            }
        });
        if !has_candidates {
            return Err(RepairError::NoImagesInArchive);
        }

        let mut dest = DestinationArchive::new();
        let outcome = expand_with_nested(&self.expander(), &name, &mut src, &mut dest.scope(""))?;
        if dest.is_empty() {
            warn!(archive = %name, failed = outcome.failed(), "no member survived repair");
            return Err(RepairError::NoValidImagesInArchive);
        }
        info!(archive = %name, written = dest.len(), failed = outcome.failed(), "archive repaired");
        Ok(Report { mode: OutputMode::NewArchiveFromSingleInput, output: Output::Archive(dest), outcome })
    }

    fn accumulate(
        &self,
        inputs: Vec<InputItem>,
        dest:   &mut DestinationArchive,
    ) -> Result<Outcome, RepairError> {
        let expander = self.expander();
        let walker = TreeWalker::new(self.codec.as_ref(), expander);
        let before = dest.len();
        let mut outcome = Outcome::new();

        for input in inputs {
            match input {
                InputItem::File(item) => {
                    let name = item.name.clone();
                    let result = self.accumulate_file(&expander, item, dest, &mut outcome);
                    outcome.settle(self.config.failure_policy, &name, result)?;
                }
                InputItem::Directory(dir) => {
                    let walked = walker.walk_root(dir.as_ref(), dest)?;
                    outcome.merge(walked);
                }
            }
        }

        if dest.len() == before {
            warn!(failed = outcome.failed(), "batch added nothing to the destination");
            return Err(RepairError::NoValidImages);
        }
        info!(added = dest.len() - before, total = dest.len(), failed = outcome.failed(), "batch complete");
        Ok(outcome)
    }

    fn accumulate_file(
        &self,
        expander: &ArchiveExpander<'_>,
        item:     RawItem,
        dest:     &mut DestinationArchive,
        outcome:  &mut Outcome,
    ) -> Result<(), RepairError> {
        match item.classification() {
            Classification::Archive => {
                let mut src = ZipSource::from_bytes(item.bytes)
                    .map_err(|e| RepairError::read(item.name.as_str(), e))?;
                let expanded = expand_with_nested(expander, &item.name, &mut src, &mut dest.scope(""))?;
                outcome.merge(expanded);
            }
            Classification::Image(media_type) => {
                let repaired = self.codec
                    .repair(&item.bytes, media_type)
                    .map_err(|e| RepairError::decode(item.name.as_str(), e))?;
                dest.put(item.name.as_str(), repaired);
                outcome.record_written(item.name);
            }
            Classification::Ignored => {
                debug!(name = %item.name, "skipping input");
            }
        }
        Ok(())
    }
}
