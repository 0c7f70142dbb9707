//! Image repair codec: decode raster bytes and re-encode them.
//!
//! The pipeline only ever talks to the [`Codec`] trait.  [`RasterCodec`] is
//! the built-in implementation backed by the `image` crate.
//!
//! # Format rules
//! The declared [`MediaType`] selects the output format; the codec never
//! converts to a canonical format.  Decoding first trusts the declared format
//! and falls back to content sniffing, so a PNG stored as `photo.jpg` is still
//! repaired (and written back as JPEG).

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use thiserror::Error;
use tracing::trace;

use crate::classify::MediaType;

/// Default JPEG re-encoding quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Encode error ({media_type}): {message}")]
    Encode { media_type: &'static str, message: String },
    #[error("Empty input")]
    Empty,
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    /// Decode `bytes` and re-encode them as `media_type`.
    fn repair(&self, bytes: &[u8], media_type: MediaType) -> Result<Vec<u8>, CodecError>;
}

// ── Built-in codec implementation ────────────────────────────────────────────

/// Re-encoding codec backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RasterCodec {
    jpeg_quality: u8,
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self { jpeg_quality: DEFAULT_JPEG_QUALITY }
    }
}

impl RasterCodec {
    pub fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality: jpeg_quality.clamp(1, 100) }
    }

    pub fn jpeg_quality(&self) -> u8 { self.jpeg_quality }

    fn decode(bytes: &[u8], media_type: MediaType) -> Result<DynamicImage, CodecError> {
        match image::load_from_memory_with_format(bytes, media_type.image_format()) {
            Ok(img) => Ok(img),
            Err(declared_err) => {
                trace!(declared = media_type.mime(), error = %declared_err,
                       "declared format did not decode, sniffing content");
                image::load_from_memory(bytes)
                    .map_err(|e| CodecError::Decode(e.to_string()))
            }
        }
    }

    fn encode(&self, img: &DynamicImage, media_type: MediaType) -> Result<Vec<u8>, CodecError> {
        let encode_err = |e: image::ImageError| CodecError::Encode {
            media_type: media_type.mime(),
            message:    e.to_string(),
        };

        let mut out = Cursor::new(Vec::new());
        match media_type {
            // JPEG has no alpha channel.
            MediaType::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut out, self.jpeg_quality);
                rgb.write_with_encoder(encoder).map_err(encode_err)?;
            }
            other => {
                let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
                rgba.write_to(&mut out, other.image_format()).map_err(encode_err)?;
            }
        }
        Ok(out.into_inner())
    }
}

impl Codec for RasterCodec {
    fn repair(&self, bytes: &[u8], media_type: MediaType) -> Result<Vec<u8>, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        let img = Self::decode(bytes, media_type)?;
        self.encode(&img, media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn sample(format: ImageFormat) -> Vec<u8> {
        let img = RgbaImage::from_fn(4, 3, |x, y| Rgba([x as u8 * 40, y as u8 * 60, 128, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn repairs_into_declared_format() {
        let codec = RasterCodec::default();
        for t in [MediaType::Png, MediaType::Gif, MediaType::Bmp, MediaType::Tiff, MediaType::Webp] {
            let out = codec.repair(&sample(t.image_format()), t).unwrap();
            assert_eq!(image::guess_format(&out).unwrap(), t.image_format(), "{t:?}");
            let back = image::load_from_memory(&out).unwrap();
            assert_eq!((back.width(), back.height()), (4, 3));
        }
    }

    #[test]
    fn jpeg_drops_alpha_and_keeps_dimensions() {
        let out = RasterCodec::new(75).repair(&sample(ImageFormat::Png), MediaType::Jpeg).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let back = image::load_from_memory(&out).unwrap();
        assert_eq!((back.width(), back.height()), (4, 3));
    }

    #[test]
    fn mislabelled_input_is_sniffed() {
        let png = sample(ImageFormat::Png);
        let out = RasterCodec::default().repair(&png, MediaType::Gif).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Gif);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = RasterCodec::default().repair(b"not an image", MediaType::Png).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
        assert!(matches!(
            RasterCodec::default().repair(&[], MediaType::Png),
            Err(CodecError::Empty)
        ));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(RasterCodec::new(0).jpeg_quality(), 1);
        assert_eq!(RasterCodec::new(200).jpeg_quality(), 100);
    }
}
