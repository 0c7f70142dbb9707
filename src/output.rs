//! Output naming and saving.
//!
//! These names are for files handed back to the user.  They are unrelated to
//! the path keys inside a destination archive.

use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_PREFIX: &str = "LANDA-FIX-";

/// Base name used when an archive has no single original name.
pub const DEFAULT_ARCHIVE_BASE: &str = "repaired_images";

#[derive(Debug, Clone)]
pub struct OutputNamer {
    prefix: String,
}

impl Default for OutputNamer {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_PREFIX)
    }
}

impl OutputNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// `prefix + original`.
    pub fn blob_name(&self, original: &str) -> String {
        format!("{}{}", self.prefix, original)
    }

    /// `prefix + base + ".zip"`, with a trailing `.zip` or `.folder` stripped from `original`.
    pub fn archive_name(&self, original: Option<&str>) -> String {
        let base = match original {
            Some(name) => name
                .strip_suffix(".zip")
                .or_else(|| name.strip_suffix(".folder"))
                .unwrap_or(name),
            None => DEFAULT_ARCHIVE_BASE,
        };
        format!("{}{}.zip", self.prefix, base)
    }

    /// Write `bytes` to `dir/name`, creating `dir` if necessary.
    pub fn save(&self, dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}
