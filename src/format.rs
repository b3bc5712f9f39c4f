//! Upload filename validation and format identification.
//!
//! Every upload names its format through its file extension. This module turns
//! that extension into a [`SupportedFormat`] and its MIME type, or rejects the
//! name before any bytes are looked at:
//!
//! - `"dawn.jpg"` → `Jpeg`, `image/jpeg`
//! - `"dawn.JPEG"` → `Jpeg`, `image/jpeg`
//! - `"logo.png"` → `Png`, `image/png`
//! - `"notes.wrong"` → `wrong is not a valid format`
//! - `"sdfs"` → `sdfs is malformed`
//!
//! Matching is ASCII case-insensitive against a closed list. Nothing else is
//! normalized: no trimming, no guessing from similar spellings.

use image::ImageFormat;
use std::fmt;
use thiserror::Error;

/// Raster formats accepted for upload and produced as renditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedFormat {
    Jpeg,
    Png,
}

/// Extensions recognized on upload filenames, mapped to their format.
const EXTENSIONS: &[(&str, SupportedFormat)] = &[
    ("jpg", SupportedFormat::Jpeg),
    ("jpeg", SupportedFormat::Jpeg),
    ("png", SupportedFormat::Png),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("{0} is malformed")]
    Malformed(String),
    #[error("{0} is not a valid format")]
    Unsupported(String),
}

impl SupportedFormat {
    pub const ALL: [SupportedFormat; 2] = [SupportedFormat::Jpeg, SupportedFormat::Png];

    /// Canonical extension, used when naming renditions.
    pub fn extension(self) -> &'static str {
        match self {
            SupportedFormat::Jpeg => "jpeg",
            SupportedFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            SupportedFormat::Jpeg => "image/jpeg",
            SupportedFormat::Png => "image/png",
        }
    }

    /// Look up a format by exact MIME type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.mime_type() == mime)
    }

    /// Look up a format by file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        EXTENSIONS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
            .map(|(_, format)| *format)
    }

    pub(crate) fn image_format(self) -> ImageFormat {
        match self {
            SupportedFormat::Jpeg => ImageFormat::Jpeg,
            SupportedFormat::Png => ImageFormat::Png,
        }
    }
}

impl fmt::Display for SupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SupportedFormat::Jpeg => "JPEG",
            SupportedFormat::Png => "PNG",
        })
    }
}

/// Resolve an upload filename to its format and MIME type.
///
/// The extension is everything after the last `.`; a name without one is
/// malformed. Pure and cheap, so callers run it before reading the payload.
pub fn resolve(filename: &str) -> Result<(SupportedFormat, &'static str), FormatError> {
    let (_, ext) = filename
        .rsplit_once('.')
        .ok_or_else(|| FormatError::Malformed(filename.to_string()))?;
    let format = SupportedFormat::from_extension(ext)
        .ok_or_else(|| FormatError::Unsupported(ext.to_string()))?;
    Ok((format, format.mime_type()))
}

/// Returns `true` when `filename` would resolve successfully.
pub fn is_supported(filename: &str) -> bool {
    resolve(filename).is_ok()
}
