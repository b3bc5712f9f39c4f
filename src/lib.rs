//! # Renditions
//!
//! Validates image uploads and produces a fixed, ordered set of scaled,
//! re-encoded renditions ready for an object store.
//!
//! # Architecture: Resolve → Generate → Persist
//!
//! ```text
//! 1. Resolve   filename       →  (format, MIME)        metadata only, no bytes read
//! 2. Generate  bytes + MIME   →  [RenditionBuffer]      decode once, resize + encode per tier
//! 3. Persist   RenditionBuffer →  bucket/{digest}/{tier}.{ext}
//! ```
//!
//! Stages 1 and 2 are the core: pure, synchronous, CPU-bound, and free of
//! I/O, so they can be unit tested with nothing but sample bytes. Stage 3 is
//! a collaborator behind the [`storage::RenditionStore`] trait.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`format`] | Filename → [`format::SupportedFormat`] + MIME type |
//! | [`rendition`] | [`rendition::ScaledImageGenerator`]: decode once, emit one buffer per tier |
//! | [`imaging`] | Codecs, resize backend, tier dimension math |
//! | [`storage`] | [`storage::RenditionStore`] trait and the local [`storage::FsStore`] |
//! | [`upload`] | [`upload::Uploader`]: resolve → generate → persist |
//! | [`config`] | `renditions.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Two Formats, Closed Dispatch
//!
//! Only JPEG and PNG are accepted, and a rendition is always encoded in the
//! same format as its upload. The format is an enum, and each variant maps to
//! its codec through an exhaustive match, so a new format cannot be half
//! added.
//!
//! ## All or Nothing
//!
//! A caller gets either the complete tier set or an error. A tier that fails
//! to encode aborts the whole call; there is no partially populated result
//! to reason about.
//!
//! ## Every Tier From the Original
//!
//! The upload is decoded once and every tier is resized from that decoded
//! original, never from a smaller tier, so rounding and resampling error do
//! not compound down the list.
//!
//! ## Content-Addressed Paths
//!
//! Rendition paths are derived from a SHA-256 digest of the upload bytes.
//! Re-uploading the same image produces the same keys, and two different
//! uploads never collide.

pub mod config;
pub mod format;
pub mod imaging;
pub mod output;
pub mod rendition;
pub mod storage;
pub mod upload;

pub use format::{FormatError, SupportedFormat, resolve};
pub use rendition::{GenerateError, RenditionBuffer, ScaledImageGenerator};
pub use storage::{FsStore, RenditionStore, StorageError};
pub use upload::{UploadError, UploadReport, Uploader};

#[cfg(test)]
pub(crate) mod test_helpers;
