use thiserror::Error;

use crate::archive::ArchiveError;
use crate::codec::CodecError;

/// Flat failure taxonomy, for callers that only need to branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoImagesInArchive,
    NoValidImagesInArchive,
    NoValidImages,
    DecodeFailure,
    ReadFailure,
    WriteFailure,
}

#[derive(Error, Debug)]
pub enum RepairError {
    /// A lone archive input has no member whose path looks like an image.
    #[error("No images found in the archive")]
    NoImagesInArchive,
    /// A lone archive input had image paths, but none survived repair.
    #[error("No valid images could be repaired from the archive")]
    NoValidImagesInArchive,
    /// A batch added nothing to its destination.
    #[error("No valid images found")]
    NoValidImages,
    #[error("Cannot decode '{path}': {source}")]
    Decode {
        path:   String,
        #[source]
        source: CodecError,
    },
    #[error("Cannot read '{path}': {source}")]
    Read {
        path:   String,
        #[source]
        source: ArchiveError,
    },
    #[error("Cannot write output archive: {0}")]
    Write(#[source] ArchiveError),
}

impl RepairError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepairError::NoImagesInArchive      => ErrorKind::NoImagesInArchive,
            RepairError::NoValidImagesInArchive => ErrorKind::NoValidImagesInArchive,
            RepairError::NoValidImages          => ErrorKind::NoValidImages,
            RepairError::Decode { .. }          => ErrorKind::DecodeFailure,
            RepairError::Read { .. }            => ErrorKind::ReadFailure,
            RepairError::Write(_)               => ErrorKind::WriteFailure,
        }
    }

    /// True for per-item failures, as opposed to "nothing useful found" outcomes.
    pub fn is_item_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::DecodeFailure | ErrorKind::ReadFailure)
    }

    pub(crate) fn decode(path: impl Into<String>, source: CodecError) -> Self {
        RepairError::Decode { path: path.into(), source }
    }

    pub(crate) fn read(path: impl Into<String>, source: impl Into<ArchiveError>) -> Self {
        RepairError::Read { path: path.into(), source: source.into() }
    }
}
