//! Scaled rendition generation.
//!
//! Turns one uploaded image into the full, ordered set of re-encoded
//! renditions, one per configured [`ScaleTier`]:
//!
//! ```text
//! raw bytes + MIME ──▶ decode once ──┬─▶ resize large  ─▶ encode ─▶ {digest}/large.jpeg
//!                                    ├─▶ resize medium ─▶ encode ─▶ {digest}/medium.jpeg
//!                                    └─▶ ...
//! ```
//!
//! ## Guarantees
//!
//! - The MIME type is checked before any decode attempt.
//! - The payload is decoded exactly once; every tier is resized from that
//!   original, never from another tier's output, so rounding never compounds.
//! - Output follows tier-declaration order, and every buffer is non-empty and
//!   carries the input MIME type.
//! - All-or-nothing: the first failing tier aborts the call and no partial
//!   set is returned.
//! - Deterministic: identical bytes and MIME type produce identical output.
//!
//! ## Storage paths
//!
//! Renditions are keyed `{digest}/{tier}.{ext}`, where `digest` is the first
//! 16 hex characters of the SHA-256 of the raw upload and `ext` is the
//! format's canonical extension. Paths are unique per tier within an upload
//! and stable across re-uploads of the same bytes.
//!
//! ## Parallelism
//!
//! With `parallel` enabled, tiers are rendered on the rayon pool. Each tier
//! works from a shared read-only original and writes its own buffer; rayon's
//! ordered collect keeps the declaration order.

use crate::config::RenditionsConfig;
use crate::format::SupportedFormat;
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, Quality, ResizeFilter, RustBackend, ScaleTier,
    TierError, TierPlan, plan_tiers, render_tier, validate_tiers,
};
use image::DynamicImage;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

/// Number of hex characters of the content hash used in storage paths.
const DIGEST_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("invalid tiers: {0}")]
    Tiers(#[from] TierError),
    #[error("{0} is not a supported mime type")]
    UnsupportedMime(String),
    #[error("could not decode upload: {0}")]
    Decode(#[source] BackendError),
    #[error("could not render tier '{tier}': {source}")]
    Encode {
        tier: String,
        #[source]
        source: BackendError,
    },
}

/// One encoded rendition, ready to hand to a
/// [`RenditionStore`](crate::storage::RenditionStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionBuffer {
    path: String,
    mime_type: &'static str,
    tier: String,
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl RenditionBuffer {
    /// Storage key, unique per tier within one upload.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Decodes an upload once and emits one re-encoded buffer per tier.
///
/// See the [module docs](self) for ordering and failure guarantees.
pub struct ScaledImageGenerator<B: ImageBackend = RustBackend> {
    backend: B,
    tiers: Vec<ScaleTier>,
    quality: Quality,
    filter: ResizeFilter,
    parallel: bool,
}

impl<B: ImageBackend> ScaledImageGenerator<B> {
    /// Generator over `tiers` with default quality and filter, rendering
    /// tiers sequentially.
    ///
    /// Fails with [`GenerateError::Tiers`] when the list is empty, repeats a
    /// name, or holds a size that would upscale or vanish.
    pub fn new(backend: B, tiers: Vec<ScaleTier>) -> Result<Self, GenerateError> {
        validate_tiers(&tiers)?;
        Ok(Self {
            backend,
            tiers,
            quality: Quality::default(),
            filter: ResizeFilter::default(),
            parallel: false,
        })
    }

    pub fn from_config(
        backend: B,
        config: &RenditionsConfig,
        parallel: bool,
    ) -> Result<Self, GenerateError> {
        Ok(Self::new(backend, config.tiers.clone())?
            .with_quality(Quality::new(config.quality))
            .with_filter(config.filter)
            .with_parallel(parallel))
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn tiers(&self) -> &[ScaleTier] {
        &self.tiers
    }

    /// Produce every rendition for `raw`, claimed to be of type `mime`.
    pub fn generate(&self, raw: &[u8], mime: &str) -> Result<Vec<RenditionBuffer>, GenerateError> {
        let format = SupportedFormat::from_mime(mime)
            .ok_or_else(|| GenerateError::UnsupportedMime(mime.to_string()))?;

        let original = self
            .backend
            .decode(raw, format)
            .map_err(GenerateError::Decode)?;
        let dims = Dimensions::of(&original);
        let digest = content_digest(raw);
        debug!(
            %format,
            width = dims.width,
            height = dims.height,
            %digest,
            "decoded upload"
        );

        let plans = plan_tiers(dims, &self.tiers);
        let render = |plan: &TierPlan<'_>| self.render(&original, plan, format, &digest);
        let renditions = if self.parallel {
            plans
                .par_iter()
                .map(render)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            plans.iter().map(render).collect::<Result<Vec<_>, _>>()?
        };

        info!(
            %digest,
            tiers = renditions.len(),
            bytes = renditions.iter().map(RenditionBuffer::len).sum::<usize>(),
            "generated renditions"
        );
        Ok(renditions)
    }

    fn render(
        &self,
        original: &DynamicImage,
        plan: &TierPlan<'_>,
        format: SupportedFormat,
        digest: &str,
    ) -> Result<RenditionBuffer, GenerateError> {
        let bytes = render_tier(
            &self.backend,
            original,
            plan,
            format,
            self.quality,
            self.filter,
        )
        .map_err(|source| GenerateError::Encode {
            tier: plan.name.to_string(),
            source,
        })?;
        debug!(
            tier = plan.name,
            width = plan.width,
            height = plan.height,
            len = bytes.len(),
            "rendered tier"
        );

        Ok(RenditionBuffer {
            path: rendition_path(digest, plan.name, format),
            mime_type: format.mime_type(),
            tier: plan.name.to_string(),
            width: plan.width,
            height: plan.height,
            bytes,
        })
    }
}

/// Short SHA-256 hex digest of the raw upload.
pub fn content_digest(raw: &[u8]) -> String {
    let hash = format!("{:x}", Sha256::digest(raw));
    hash[..DIGEST_LEN].to_string()
}

fn rendition_path(digest: &str, tier: &str, format: SupportedFormat) -> String {
    format!("{digest}/{tier}.{}", format.extension())
}
