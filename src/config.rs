//! Run configuration, loadable from a JSON file.
//!
//! Every field has a default, so `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "failure_policy": "skip",
//!   "nested_archives": false,
//!   "jpeg_quality": 90,
//!   "compression": "deflated",
//!   "compression_level": null,
//!   "page_size": 64,
//!   "output_prefix": "LANDA-FIX-"
//! }
//! ```

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::{Compression, PackOptions};
use crate::codec::DEFAULT_JPEG_QUALITY;
use crate::entry_source::fs::DEFAULT_PAGE_SIZE;
use crate::outcome::FailurePolicy;
use crate::output::DEFAULT_OUTPUT_PREFIX;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("jpeg_quality must be within 1..=100, got {0}")]
    JpegQuality(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepairConfig {
    pub failure_policy:    FailurePolicy,
    /// Expand archives found inside archives.
    pub nested_archives:   bool,
    pub jpeg_quality:      u8,
    pub compression:       Compression,
    pub compression_level: Option<i64>,
    /// Directory entries per listing page.
    pub page_size:         usize,
    pub output_prefix:     String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            failure_policy:    FailurePolicy::Skip,
            nested_archives:   false,
            jpeg_quality:      DEFAULT_JPEG_QUALITY,
            compression:       Compression::Deflated,
            compression_level: None,
            page_size:         DEFAULT_PAGE_SIZE,
            output_prefix:     DEFAULT_OUTPUT_PREFIX.to_owned(),
        }
    }
}

impl RepairConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::JpegQuality(self.jpeg_quality));
        }
        Ok(())
    }

    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            compression: self.compression,
            level:       self.compression_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(RepairConfig::from_json("{}").unwrap(), RepairConfig::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = RepairConfig::from_json(
            r#"{"failure_policy": "abort", "nested_archives": true, "compression": "stored"}"#,
        ).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.nested_archives);
        assert_eq!(config.pack_options().compression, Compression::Stored);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(RepairConfig::from_json(r#"{"jpeg_quality": 0}"#), Err(ConfigError::JpegQuality(0))));
        assert!(matches!(RepairConfig::from_json(r#"{"bogus": 1}"#), Err(ConfigError::Parse(_))));
        assert!(matches!(RepairConfig::from_json(r#"{"failure_policy": "retry"}"#), Err(ConfigError::Parse(_))));
    }
}
