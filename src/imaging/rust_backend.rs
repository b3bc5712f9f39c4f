//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | per-format [`Codec`](super::codec::Codec) over `image::ImageReader` |
//! | Resize | `image::DynamicImage::resize_exact` with the configured filter (default `Lanczos3`) |
//! | Encode | per-format [`Codec`](super::codec::Codec): `JpegEncoder` / `PngEncoder` |

use super::backend::{BackendError, ImageBackend};
use super::params::{EncodeParams, ResizeParams};
use crate::format::SupportedFormat;
use image::DynamicImage;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], format: SupportedFormat) -> Result<DynamicImage, BackendError> {
        format.codec().decode(bytes)
    }

    fn resize(
        &self,
        img: &DynamicImage,
        params: &ResizeParams,
    ) -> Result<DynamicImage, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Invalid target size {}x{}",
                params.width, params.height
            )));
        }
        if (params.width, params.height) == (img.width(), img.height()) {
            return Ok(img.clone());
        }
        Ok(img.resize_exact(params.width, params.height, params.filter.into()))
    }

    fn encode(&self, img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        params.format.codec().encode(img, params.quality)
    }
}
