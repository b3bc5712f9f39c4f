//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take
//! tier configuration, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{TierSize, calculate_tier_dimensions};
use super::params::{EncodeParams, Quality, ResizeFilter, ResizeParams};
use crate::format::SupportedFormat;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// One entry in the fixed list of rendition sizes.
///
/// The size is flattened into the tier table: `{ name = "medium", factor = 0.5 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleTier {
    /// Tier name, used as the rendition's file stem (`medium.jpeg`).
    pub name: String,
    #[serde(flatten)]
    pub size: TierSize,
}

impl ScaleTier {
    pub fn factor(name: &str, factor: f64) -> Self {
        Self {
            name: name.to_string(),
            size: TierSize::Factor(factor),
        }
    }

    pub fn long_edge(name: &str, pixels: u32) -> Self {
        Self {
            name: name.to_string(),
            size: TierSize::LongEdge(pixels),
        }
    }
}

/// Stock tier set applied when no configuration overrides it.
pub fn default_tiers() -> Vec<ScaleTier> {
    vec![
        ScaleTier::factor("large", 1.0),
        ScaleTier::factor("medium", 0.5),
        ScaleTier::factor("small", 0.25),
        ScaleTier::long_edge("thumb", 160),
    ]
}

/// A tier list that cannot yield a complete, uniquely keyed rendition set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TierError {
    #[error("tier list must not be empty")]
    Empty,
    #[error("tier name '{0}' must be non-empty and use only a-z, 0-9, '-' or '_'")]
    InvalidName(String),
    #[error("duplicate tier name '{0}'")]
    DuplicateName(String),
    #[error("tier '{tier}': factor must be in (0, 1], got {factor}")]
    Factor { tier: String, factor: f64 },
    #[error("tier '{tier}': long_edge must be positive")]
    LongEdge { tier: String },
}

/// Check a tier list before any image is rendered with it.
///
/// Names become storage path stems, so they must be unique and path-safe.
/// Sizes must never upscale or collapse to zero.
pub fn validate_tiers(tiers: &[ScaleTier]) -> std::result::Result<(), TierError> {
    if tiers.is_empty() {
        return Err(TierError::Empty);
    }
    let mut seen = HashSet::new();
    for tier in tiers {
        if !is_valid_tier_name(&tier.name) {
            return Err(TierError::InvalidName(tier.name.clone()));
        }
        if !seen.insert(tier.name.as_str()) {
            return Err(TierError::DuplicateName(tier.name.clone()));
        }
        match tier.size {
            TierSize::Factor(factor) if !(factor.is_finite() && factor > 0.0 && factor <= 1.0) => {
                return Err(TierError::Factor {
                    tier: tier.name.clone(),
                    factor,
                });
            }
            TierSize::LongEdge(0) => {
                return Err(TierError::LongEdge {
                    tier: tier.name.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_valid_tier_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// A tier with its output dimensions resolved against one original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPlan<'a> {
    pub name: &'a str,
    pub width: u32,
    pub height: u32,
}

/// Resolve every tier against the original dimensions, in declaration order.
pub fn plan_tiers(original: Dimensions, tiers: &[ScaleTier]) -> Vec<TierPlan<'_>> {
    tiers
        .iter()
        .map(|tier| {
            let (width, height) =
                calculate_tier_dimensions((original.width, original.height), tier.size);
            TierPlan {
                name: &tier.name,
                width,
                height,
            }
        })
        .collect()
}

/// Resize `original` to one planned tier and encode it.
///
/// Always resizes from `original`, never from another tier's output.
pub fn render_tier(
    backend: &impl ImageBackend,
    original: &DynamicImage,
    plan: &TierPlan<'_>,
    format: SupportedFormat,
    quality: Quality,
    filter: ResizeFilter,
) -> Result<Vec<u8>> {
    let resized = backend.resize(
        original,
        &ResizeParams {
            width: plan.width,
            height: plan.height,
            filter,
        },
    )?;
    let encoded = backend.encode(&resized, &EncodeParams { format, quality })?;
    if encoded.is_empty() {
        return Err(BackendError::Encode {
            format,
            width: plan.width,
            height: plan.height,
            reason: "encoder produced no data".into(),
        });
    }
    Ok(encoded)
}
