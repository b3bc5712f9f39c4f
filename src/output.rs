//! CLI output formatting.
//!
//! Every command prints one block per input file: a header line with the
//! file's position and name, then indented detail lines.
//!
//! # Output Format
//!
//! ## Resolve
//!
//! ```text
//! 001 dawn.jpg → JPEG (image/jpeg)
//! 002 notes.txt → txt is not a valid format
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 dawn.jpg (JPEG)
//!     large   1920x1280  412.6 KiB  3f2a9c0d1e4b5a67/large.jpeg
//!     medium   960x640   118.0 KiB  3f2a9c0d1e4b5a67/medium.jpeg
//! ```
//!
//! ## Upload
//!
//! ```text
//! 001 dawn.jpg (JPEG) → media
//!     large   1920x1280  412.6 KiB  3f2a9c0d1e4b5a67/large.jpeg
//!     ...
//!
//! Uploaded 1 file, 4 renditions, 598.2 KiB
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability; `main` does the printing. Format functions are pure.

use crate::format::{FormatError, SupportedFormat};
use crate::rendition::RenditionBuffer;
use crate::upload::UploadReport;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count (binary units, one decimal).
pub fn format_bytes(len: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    if len < 1024 {
        return format!("{len} B");
    }
    let mut value = len as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// One detail line per rendition.
fn rendition_line(tier: &str, width: u32, height: u32, len: usize, path: &str) -> String {
    format!(
        "{}{:<8}{:>5}x{:<5} {:>10}  {}",
        indent(1),
        tier,
        width,
        height,
        format_bytes(len),
        path
    )
}

/// Format the result of resolving one filename.
pub fn format_resolve_line(
    index: usize,
    filename: &str,
    result: &Result<(SupportedFormat, &'static str), FormatError>,
) -> String {
    match result {
        Ok((format, mime)) => format!("{} {filename} → {format} ({mime})", format_index(index)),
        Err(e) => format!("{} {filename} → {e}", format_index(index)),
    }
}

/// Format an in-memory rendition set for `check`.
pub fn format_check_output(
    index: usize,
    filename: &str,
    format: SupportedFormat,
    renditions: &[RenditionBuffer],
) -> Vec<String> {
    let mut lines = vec![format!("{} {filename} ({format})", format_index(index))];
    lines.extend(renditions.iter().map(|r| {
        rendition_line(r.tier(), r.width(), r.height(), r.len(), r.path())
    }));
    lines
}

/// Format a failed file for `check` or `upload`.
pub fn format_failure(index: usize, filename: &str, error: &dyn std::error::Error) -> Vec<String> {
    vec![
        format!("{} {filename}", format_index(index)),
        format!("{}error: {error}", indent(1)),
    ]
}

/// Format one stored upload.
pub fn format_upload_report(index: usize, report: &UploadReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} ({}) → {}",
        format_index(index),
        report.filename,
        report.format,
        report.bucket
    )];
    lines.extend(
        report
            .objects
            .iter()
            .map(|o| rendition_line(&o.tier, o.width, o.height, o.len, &o.path)),
    );
    lines
}

/// Closing summary line for `upload`.
pub fn format_upload_summary(reports: &[UploadReport], failures: usize) -> String {
    let renditions: usize = reports.iter().map(|r| r.objects.len()).sum();
    let bytes: usize = reports.iter().map(UploadReport::total_bytes).sum();
    let files = reports.len();
    let mut line = format!(
        "Uploaded {files} {}, {renditions} renditions, {}",
        if files == 1 { "file" } else { "files" },
        format_bytes(bytes)
    );
    if failures > 0 {
        line.push_str(&format!(", {failures} failed"));
    }
    line
}
