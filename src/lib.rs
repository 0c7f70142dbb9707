pub mod classify;
pub mod codec;
pub mod archive;
pub mod entry_source;
pub mod outcome;
pub mod expand;
pub mod walk;
pub mod orchestrator;
pub mod error;
pub mod config;
pub mod output;

pub use classify::{classify, Classification, MediaType};
pub use codec::{Codec, RasterCodec};
pub use archive::{DestinationArchive, PackOptions};
pub use error::{ErrorKind, RepairError};
pub use config::RepairConfig;
pub use orchestrator::{BatchOrchestrator, InputItem, Output, OutputMode, Report};
