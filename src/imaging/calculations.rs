//! Pure calculation functions for tier dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use serde::{Deserialize, Serialize};

/// How a tier's output size relates to the original image.
///
/// Serialized as a single-key table in `config.toml`:
/// `{ factor = 0.5 }` or `{ long_edge = 160 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierSize {
    /// Scale both edges by this factor.
    Factor(f64),
    /// Scale so the longer edge has this many pixels. Never upscales.
    LongEdge(u32),
}

/// Calculate output dimensions for one tier, preserving aspect ratio.
///
/// Each edge is rounded to the nearest pixel and never drops below 1, so
/// extreme panoramas still produce a valid image. A `LongEdge` target larger
/// than the original yields the original dimensions.
///
/// # Examples
/// ```
/// # use renditions::imaging::{TierSize, calculate_tier_dimensions};
/// assert_eq!(calculate_tier_dimensions((2000, 1500), TierSize::Factor(0.5)), (1000, 750));
/// assert_eq!(calculate_tier_dimensions((1500, 2000), TierSize::LongEdge(1000)), (750, 1000));
/// ```
pub fn calculate_tier_dimensions(original: (u32, u32), size: TierSize) -> (u32, u32) {
    let (orig_w, orig_h) = original;

    let ratio = match size {
        TierSize::Factor(factor) => factor,
        TierSize::LongEdge(target) => {
            let longer_edge = orig_w.max(orig_h);
            if target >= longer_edge {
                return original;
            }
            target as f64 / longer_edge as f64
        }
    };

    (scale_edge(orig_w, ratio), scale_edge(orig_h, ratio))
}

fn scale_edge(edge: u32, ratio: f64) -> u32 {
    ((edge as f64 * ratio).round() as u32).max(1)
}
