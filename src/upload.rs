//! Upload orchestration: resolve → generate → persist.
//!
//! [`Uploader`] is the thin client around the rendition pipeline. It checks
//! the filename first (no bytes are decoded for a bad name), generates the
//! complete rendition set, then hands each buffer to the store one at a time
//! in tier order. The first storage failure stops the upload; objects stored
//! before it are left in place and the store is not retried.

use crate::format::{self, FormatError, SupportedFormat};
use crate::imaging::{ImageBackend, RustBackend};
use crate::rendition::{GenerateError, ScaledImageGenerator};
use crate::storage::{RenditionStore, StorageError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("{filename}: {source}")]
    Storage {
        filename: String,
        /// Objects already stored before the failure, in tier order.
        stored: Vec<String>,
        #[source]
        source: StorageError,
    },
}

/// One object written by an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub path: String,
    pub tier: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub len: usize,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub filename: String,
    pub bucket: String,
    #[serde(serialize_with = "serialize_format")]
    pub format: SupportedFormat,
    pub objects: Vec<StoredObject>,
}

fn serialize_format<S: serde::Serializer>(
    format: &SupportedFormat,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(format)
}

impl UploadReport {
    pub fn total_bytes(&self) -> usize {
        self.objects.iter().map(|o| o.len).sum()
    }
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) → {} renditions in '{}'",
            self.filename,
            self.format,
            self.objects.len(),
            self.bucket
        )
    }
}

/// Composes a [`ScaledImageGenerator`] with a [`RenditionStore`].
pub struct Uploader<S: RenditionStore, B: ImageBackend = RustBackend> {
    generator: ScaledImageGenerator<B>,
    store: S,
}

impl<S: RenditionStore, B: ImageBackend> Uploader<S, B> {
    pub fn new(generator: ScaledImageGenerator<B>, store: S) -> Self {
        Self { generator, store }
    }

    pub fn generator(&self) -> &ScaledImageGenerator<B> {
        &self.generator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate, render, and store one upload.
    pub fn upload(
        &self,
        bucket: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<UploadReport, UploadError> {
        let (format, mime) = format::resolve(filename).inspect_err(|e| {
            warn!(filename, error = %e, "rejected upload name");
        })?;
        let renditions = self.generator.generate(bytes, mime).inspect_err(|e| {
            warn!(filename, error = %e, "rendition generation failed");
        })?;

        let mut objects = Vec::with_capacity(renditions.len());
        for rendition in renditions {
            let object = StoredObject {
                path: rendition.path().to_string(),
                tier: rendition.tier().to_string(),
                mime_type: rendition.mime_type().to_string(),
                width: rendition.width(),
                height: rendition.height(),
                len: rendition.len(),
            };
            if let Err(source) = self.store.persist(filename, bucket, rendition) {
                return Err(UploadError::Storage {
                    filename: filename.to_string(),
                    stored: objects.into_iter().map(|o: StoredObject| o.path).collect(),
                    source,
                });
            }
            objects.push(object);
        }

        let report = UploadReport {
            filename: filename.to_string(),
            bucket: bucket.to_string(),
            format,
            objects,
        };
        info!(
            filename,
            bucket,
            renditions = report.objects.len(),
            bytes = report.total_bytes(),
            "upload stored"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::MemoryStore;
    use crate::test_helpers::*;

    fn uploader(store: MemoryStore) -> Uploader<MemoryStore> {
        Uploader::new(generator(), store)
    }

    #[test]
    fn upload_stores_every_tier_in_order() {
        let uploader = uploader(MemoryStore::default());
        let bytes = sample_jpeg(320, 240);

        let report = uploader.upload("media", "dawn.jpg", &bytes).unwrap();

        assert_eq!(report.format, SupportedFormat::Jpeg);
        assert_eq!(report.objects.len(), 4);
        let tiers: Vec<&str> = report.objects.iter().map(|o| o.tier.as_str()).collect();
        assert_eq!(tiers, ["large", "medium", "small", "thumb"]);

        let stored_paths = uploader.store().paths();
        let report_paths: Vec<String> = report.objects.iter().map(|o| o.path.clone()).collect();
        assert_eq!(stored_paths, report_paths);

        for (bucket, mime, _) in uploader.store().objects.lock().unwrap().iter() {
            assert_eq!(bucket, "media");
            assert_eq!(mime, "image/jpeg");
        }
    }

    #[test]
    fn png_upload_reports_png() {
        let uploader = uploader(MemoryStore::default());
        let report = uploader
            .upload("media", "logo.png", &sample_png(64, 64))
            .unwrap();
        assert_eq!(report.format, SupportedFormat::Png);
        assert!(report.objects.iter().all(|o| o.mime_type == "image/png"));
        assert!(report.total_bytes() > 0);
    }

    #[test]
    fn bad_name_never_reaches_generator_or_store() {
        let uploader = uploader(MemoryStore::default());

        let err = uploader.upload("media", "sdfs", &[]).unwrap_err();
        assert_eq!(err.to_string(), "sdfs is malformed");

        let err = uploader.upload("media", "i.wrong", &[]).unwrap_err();
        assert_eq!(err.to_string(), "wrong is not a valid format");

        assert!(uploader.store().paths().is_empty());
    }

    #[test]
    fn corrupt_payload_stores_nothing() {
        let uploader = uploader(MemoryStore::default());
        let err = uploader
            .upload("media", "photo.jpg", b"not a jpeg")
            .unwrap_err();
        assert!(matches!(err, UploadError::Generate(GenerateError::Decode(_))));
        assert!(uploader.store().paths().is_empty());
    }

    #[test]
    fn storage_failure_stops_upload() {
        let uploader = uploader(MemoryStore::failing_after(2));
        let err = uploader
            .upload("media", "dawn.jpeg", &sample_jpeg(100, 80))
            .unwrap_err();

        match err {
            UploadError::Storage {
                filename, stored, ..
            } => {
                assert_eq!(filename, "dawn.jpeg");
                assert_eq!(stored.len(), 2);
                assert!(stored[0].ends_with("/large.jpeg"));
                assert!(stored[1].ends_with("/medium.jpeg"));
            }
            other => panic!("expected storage error, got {other:?}"),
        }
        assert_eq!(uploader.store().paths().len(), 2);
    }

    #[test]
    fn report_display_summarizes() {
        let uploader = uploader(MemoryStore::default());
        let report = uploader
            .upload("avatars", "me.png", &sample_png(10, 10))
            .unwrap();
        assert_eq!(report.to_string(), "me.png (PNG) → 4 renditions in 'avatars'");
    }

    #[test]
    fn report_serializes_format_as_name() {
        let uploader = uploader(MemoryStore::default());
        let report = uploader
            .upload("media", "a.jpg", &sample_jpeg(10, 10))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["format"], "JPEG");
        assert_eq!(json["objects"].as_array().unwrap().len(), 4);
    }
}
