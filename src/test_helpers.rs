//! Shared test utilities for the renditions test suite.
//!
//! Sample images are synthesized in memory with the `image` crate, so no
//! binary fixtures live in the repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let bytes = sample_jpeg(640, 480);
//! let set = generator().generate(&bytes, "image/jpeg").unwrap();
//! assert_tier_names(&set, &["large", "medium", "small", "thumb"]);
//! ```

use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};

use crate::config::RenditionsConfig;
use crate::imaging::RustBackend;
use crate::rendition::{RenditionBuffer, ScaledImageGenerator};

// =========================================================================
// Sample images
// =========================================================================

/// Gradient pattern so resizes and encodes do real work.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Encode a synthetic RGB image as JPEG.
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Encode a synthetic RGBA image (half-transparent) as PNG.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let rgb = gradient(width, height);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        image::Rgba([r, g, b, if x < width / 2 { 255 } else { 128 }])
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

/// Decode rendition bytes back into an image, panicking with context on failure.
pub fn decode_rendition(rendition: &RenditionBuffer) -> DynamicImage {
    image::load_from_memory(rendition.bytes()).unwrap_or_else(|e| {
        panic!("rendition '{}' does not decode: {e}", rendition.path())
    })
}

// =========================================================================
// Generators
// =========================================================================

/// Generator with the stock tier set and the production backend.
pub fn generator() -> ScaledImageGenerator<RustBackend> {
    ScaledImageGenerator::from_config(RustBackend::new(), &RenditionsConfig::default(), true)
        .expect("stock tiers are valid")
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert the rendition set has exactly these tiers, in this order.
pub fn assert_tier_names(set: &[RenditionBuffer], expected: &[&str]) {
    let actual: Vec<&str> = set.iter().map(|r| r.tier()).collect();
    assert_eq!(actual, expected, "tier order mismatch");
}
