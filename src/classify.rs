//! Input classification: image, archive, or ignored.
//!
//! Classification looks at two things only: the declared content type that
//! travels with an item, and the extension of its path.  Byte content is
//! never inspected.
//!
//! # Rules
//! - Declared type `application/zip` → [`Classification::Archive`].
//! - Declared type in the supported image set → [`Classification::Image`].
//! - No declared type (entries extracted from an archive): the path's
//!   extension decides, case-insensitively.  `zip` → `Archive`, one of
//!   `jpg jpeg png gif webp bmp tiff` → `Image`.
//! - Anything else → [`Classification::Ignored`].

use serde::{Deserialize, Serialize};

/// The single recognised archive content type.
pub const ZIP_MIME: &str = "application/zip";

/// Content type assumed when an image type has to be synthesised from a
/// path whose extension is not in the supported set.
pub const DEFAULT_MEDIA_TYPE: MediaType = MediaType::Jpeg;

// ── MediaType ────────────────────────────────────────────────────────────────

/// A supported raster image content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Tiff,
}

impl MediaType {
    pub const ALL: [MediaType; 6] = [
        MediaType::Jpeg,
        MediaType::Png,
        MediaType::Gif,
        MediaType::Webp,
        MediaType::Bmp,
        MediaType::Tiff,
    ];

    /// The MIME string for this type.
    #[inline]
    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png  => "image/png",
            MediaType::Gif  => "image/gif",
            MediaType::Webp => "image/webp",
            MediaType::Bmp  => "image/bmp",
            MediaType::Tiff => "image/tiff",
        }
    }

    /// Exact match against the supported MIME set.
    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.mime() == mime)
    }

    /// Case-insensitive match against the supported extension set.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png"          => Some(MediaType::Png),
            "gif"          => Some(MediaType::Gif),
            "webp"         => Some(MediaType::Webp),
            "bmp"          => Some(MediaType::Bmp),
            "tiff"         => Some(MediaType::Tiff),
            _              => None,
        }
    }

    /// Format handle for the `image` crate.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            MediaType::Jpeg => image::ImageFormat::Jpeg,
            MediaType::Png  => image::ImageFormat::Png,
            MediaType::Gif  => image::ImageFormat::Gif,
            MediaType::Webp => image::ImageFormat::WebP,
            MediaType::Bmp  => image::ImageFormat::Bmp,
            MediaType::Tiff => image::ImageFormat::Tiff,
        }
    }
}

// ── Classification ───────────────────────────────────────────────────────────

/// What the pipeline does with an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// A raster image to run through the codec, with the type to re-encode to.
    Image(MediaType),
    /// A container to expand.
    Archive,
    Ignored,
}

impl Classification {
    #[inline]
    pub fn is_image(self) -> bool {
        matches!(self, Classification::Image(_))
    }

    /// Short label for diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Classification::Image(_) => "image",
            Classification::Archive  => "archive",
            Classification::Ignored  => "ignored",
        }
    }
}

/// Classify an item from its path and optional declared content type.
///
/// When `declared` is present it is authoritative and the extension is not
/// consulted.  When it is absent the extension decides.
pub fn classify(path: &str, declared: Option<&str>) -> Classification {
    match declared {
        Some(ZIP_MIME) => Classification::Archive,
        Some(mime) => match MediaType::from_mime(mime) {
            Some(t) => Classification::Image(t),
            None    => Classification::Ignored,
        },
        None => classify_by_extension(path),
    }
}

/// Extension-only classification, used for archive members.
pub fn classify_by_extension(path: &str) -> Classification {
    let Some(ext) = extension(path) else {
        return Classification::Ignored;
    };
    if ext.eq_ignore_ascii_case("zip") {
        return Classification::Archive;
    }
    match MediaType::from_extension(ext) {
        Some(t) => Classification::Image(t),
        None    => Classification::Ignored,
    }
}

/// Resolve the content type to re-encode an archive member as.
///
/// Unrecognised extensions resolve to [`DEFAULT_MEDIA_TYPE`].
pub fn media_type_for_path(path: &str) -> MediaType {
    extension(path)
        .and_then(MediaType::from_extension)
        .unwrap_or(DEFAULT_MEDIA_TYPE)
}

/// The content type a host would label a file with, judged by its name.
pub fn declared_type_for_name(name: &str) -> Option<&'static str> {
    match classify_by_extension(name) {
        Classification::Image(t) => Some(t.mime()),
        Classification::Archive  => Some(ZIP_MIME),
        Classification::Ignored  => None,
    }
}

/// Extension of the last path segment, without the dot.
fn extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.rsplit_once('.').map(|(_, ext)| ext).filter(|ext| !ext.is_empty())
}
