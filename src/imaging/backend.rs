//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the rendition
//! pipeline needs: decode, resize, and encode. Everything happens on
//! in-memory buffers; no backend touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate and the per-format [`Codec`](super::codec::Codec)s.

use super::params::{EncodeParams, ResizeParams};
use crate::format::SupportedFormat;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{format} decode failed: {reason}")]
    Decode {
        format: SupportedFormat,
        reason: String,
    },
    #[error("{format} encode failed at {width}x{height}: {reason}")]
    Encode {
        format: SupportedFormat,
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(img: &DynamicImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
        }
    }
}

/// Trait for image processing backends.
///
/// `resize` must return a new image and leave its input untouched: the
/// rendition pipeline resizes every tier from the same decoded original.
pub trait ImageBackend: Sync {
    /// Decode `bytes` as `format`.
    fn decode(&self, bytes: &[u8], format: SupportedFormat) -> Result<DynamicImage, BackendError>;

    /// Produce a resized copy of `img`.
    fn resize(&self, img: &DynamicImage, params: &ResizeParams)
    -> Result<DynamicImage, BackendError>;

    /// Encode `img` into a fresh buffer.
    fn encode(&self, img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
