//! Image processing: pure Rust, in memory.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with the format pinned (JPEG, PNG) |
//! | **Resize** | `resize_exact`, Lanczos3 by default |
//! | **Encode** | `JpegEncoder` (quality) / `PngEncoder` (lossless) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for tier dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Codec**: One decode/encode pair per [`SupportedFormat`](crate::format::SupportedFormat)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Tier planning and per-tier resize + encode

pub mod backend;
mod calculations;
pub mod codec;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{TierSize, calculate_tier_dimensions};
pub use codec::Codec;
pub use operations::{
    ScaleTier, TierError, TierPlan, default_tiers, plan_tiers, render_tier, validate_tiers,
};
pub use params::{EncodeParams, Quality, ResizeFilter, ResizeParams};
pub use rust_backend::RustBackend;
