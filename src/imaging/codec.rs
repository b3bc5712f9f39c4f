//! Per-format decode/encode capability.
//!
//! Each [`SupportedFormat`] maps to exactly one [`Codec`] through an
//! exhaustive match in [`SupportedFormat::codec`], so adding a format is a
//! compile error until its codec exists.
//!
//! | Format | Decode | Encode |
//! |---|---|---|
//! | JPEG | `image` JPEG decoder | `JpegEncoder::new_with_quality` on RGB8 |
//! | PNG | `image` PNG decoder | `PngEncoder` (lossless, quality ignored) |

use super::backend::BackendError;
use super::params::Quality;
use crate::format::SupportedFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Decode and encode one raster format entirely in memory.
pub trait Codec: Sync {
    fn format(&self) -> SupportedFormat;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    fn encode(&self, img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError>;
}

pub struct JpegCodec;

pub struct PngCodec;

impl SupportedFormat {
    pub fn codec(self) -> &'static dyn Codec {
        match self {
            SupportedFormat::Jpeg => &JpegCodec,
            SupportedFormat::Png => &PngCodec,
        }
    }
}

/// Decode with the decoder for `format` only; content sniffing is disabled so
/// a PNG claimed as JPEG fails instead of silently decoding.
fn decode_as(bytes: &[u8], format: SupportedFormat) -> Result<DynamicImage, BackendError> {
    ImageReader::with_format(Cursor::new(bytes), format.image_format())
        .decode()
        .map_err(|e| BackendError::Decode {
            format,
            reason: e.to_string(),
        })
}

fn encode_failed(format: SupportedFormat, img: &DynamicImage, e: image::ImageError) -> BackendError {
    BackendError::Encode {
        format,
        width: img.width(),
        height: img.height(),
        reason: e.to_string(),
    }
}

impl Codec for JpegCodec {
    fn format(&self) -> SupportedFormat {
        SupportedFormat::Jpeg
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        decode_as(bytes, SupportedFormat::Jpeg)
    }

    fn encode(&self, img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
        let mut buf = Cursor::new(Vec::new());
        // JPEG has no alpha channel
        let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
        img.to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| encode_failed(SupportedFormat::Jpeg, img, e))?;
        Ok(buf.into_inner())
    }
}

impl Codec for PngCodec {
    fn format(&self) -> SupportedFormat {
        SupportedFormat::Png
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        decode_as(bytes, SupportedFormat::Png)
    }

    fn encode(&self, img: &DynamicImage, _quality: Quality) -> Result<Vec<u8>, BackendError> {
        let mut buf = Cursor::new(Vec::new());
        img.write_with_encoder(PngEncoder::new(&mut buf))
            .map_err(|e| encode_failed(SupportedFormat::Png, img, e))?;
        Ok(buf.into_inner())
    }
}
