//! Persistence of renditions.
//!
//! The rendition pipeline never touches storage itself; it hands each
//! [`RenditionBuffer`] to a [`RenditionStore`]. A store writes the bytes under
//! the rendition's path inside a bucket, records its content type, and makes
//! it publicly readable. Failures are reported by stage and never retried.
//!
//! [`FsStore`] is the bundled implementation: buckets are directories under a
//! root, and each object gets a JSON sidecar holding its content type.
//!
//! ```text
//! storage/                          ← root
//! └── media/                        ← bucket
//!     └── 3f2a9c0d1e4b5a67/
//!         ├── large.jpeg
//!         ├── large.jpeg.meta.json  ← {"content_type":"image/jpeg",...}
//!         └── ...
//! ```
//!
//! ## Write protocol
//!
//! 1. **Connect**: create the bucket directory if needed.
//! 2. **Write**: stream the bytes and the sidecar JSON into hidden
//!    `.name.partial` siblings.
//! 3. **Finalize**: fsync, then rename each over its final name (atomic on
//!    POSIX), object first. If the sidecar rename fails the object is removed
//!    again, so an object is never left without its metadata.
//! 4. **Permission**: mode `0644` on object and sidecar (Unix).
//!
//! The partial file is owned by a guard that deletes it on drop unless the
//! rename succeeded, so no error path leaves debris behind.

use crate::rendition::RenditionBuffer;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Suffix of the metadata sidecar written next to every object.
const META_SUFFIX: &str = ".meta.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("could not open bucket '{bucket}': {source}")]
    Connect {
        bucket: String,
        #[source]
        source: io::Error,
    },
    #[error("could not write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("could not finalize '{path}': {source}")]
    Finalize {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("could not grant public read on '{path}': {source}")]
    Permission {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid object path '{0}'")]
    InvalidPath(String),
}

/// Destination for generated renditions.
pub trait RenditionStore: Sync {
    /// Store `rendition` under its path in `bucket`.
    ///
    /// `prefix` is the caller's log context (typically the upload filename)
    /// and is attached to every log line the store emits.
    fn persist(
        &self,
        prefix: &str,
        bucket: &str,
        rendition: RenditionBuffer,
    ) -> Result<(), StorageError>;
}

/// Metadata recorded alongside each stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub content_type: String,
    pub length: u64,
    pub tier: String,
    pub width: u32,
    pub height: u32,
    pub public_read: bool,
}

/// Local filesystem object store.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of an object. Does not check existence.
    pub fn object_path(&self, bucket: &str, path: &str) -> PathBuf {
        self.root.join(bucket).join(path)
    }

    /// Read the sidecar metadata of a stored object.
    pub fn stat(&self, bucket: &str, path: &str) -> io::Result<ObjectMeta> {
        let content = fs::read_to_string(sidecar_path(&self.object_path(bucket, path)))?;
        serde_json::from_str(&content).map_err(io::Error::other)
    }

    fn open_bucket(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        if !is_relative_key(bucket) || Path::new(bucket).components().count() != 1 {
            return Err(StorageError::InvalidPath(bucket.to_string()));
        }
        let dir = self.root.join(bucket);
        fs::create_dir_all(&dir).map_err(|source| StorageError::Connect {
            bucket: bucket.to_string(),
            source,
        })?;
        Ok(dir)
    }
}

impl RenditionStore for FsStore {
    fn persist(
        &self,
        prefix: &str,
        bucket: &str,
        rendition: RenditionBuffer,
    ) -> Result<(), StorageError> {
        let key = rendition.path().to_string();
        if !is_relative_key(&key) {
            return Err(StorageError::InvalidPath(key));
        }

        let bucket_dir = self.open_bucket(bucket).inspect_err(|e| {
            warn!(prefix, bucket, error = %e, "error opening bucket");
        })?;
        let target = bucket_dir.join(&key);
        let meta = ObjectMeta {
            content_type: rendition.mime_type().to_string(),
            length: rendition.len() as u64,
            tier: rendition.tier().to_string(),
            width: rendition.width(),
            height: rendition.height(),
            public_read: true,
        };

        let write_err = |source| StorageError::Write {
            path: key.clone(),
            source,
        };
        let finalize_err = |source| StorageError::Finalize {
            path: key.clone(),
            source,
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut object = PendingObject::create(&target).map_err(write_err)?;
        object
            .write_all(rendition.bytes())
            .map_err(write_err)
            .inspect_err(|e| warn!(prefix, path = %key, error = %e, "error while copying file"))?;

        let sidecar = sidecar_path(&target);
        let json = serde_json::to_vec_pretty(&meta).map_err(|e| write_err(io::Error::other(e)))?;
        let mut pending_meta = PendingObject::create(&sidecar).map_err(write_err)?;
        pending_meta
            .write_all(&json)
            .map_err(write_err)
            .inspect_err(|e| warn!(prefix, path = %key, error = %e, "error while writing metadata"))?;

        object
            .commit(&target)
            .map_err(finalize_err)
            .inspect_err(|e| warn!(prefix, path = %key, error = %e, "error closing file"))?;
        if let Err(e) = pending_meta.commit(&sidecar) {
            // An object without its metadata is not stored
            let _ = fs::remove_file(&target);
            warn!(prefix, path = %key, error = %e, "error closing metadata, object removed");
            return Err(finalize_err(e));
        }

        for path in [&target, &sidecar] {
            grant_public_read(path)
                .map_err(|source| StorageError::Permission {
                    path: key.clone(),
                    source,
                })
                .inspect_err(|e| {
                    warn!(prefix, path = %key, error = %e, "error defining read permission")
                })?;
        }

        debug!(prefix, bucket, path = %key, len = meta.length, "stored rendition");
        Ok(())
    }
}

/// Object keys must stay inside their bucket.
fn is_relative_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn sidecar_path(object: &Path) -> PathBuf {
    let mut name = object.as_os_str().to_os_string();
    name.push(META_SUFFIX);
    PathBuf::from(name)
}

#[cfg(unix)]
fn grant_public_read(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn grant_public_read(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(false);
    fs::set_permissions(path, perms)
}

/// A file being written next to its final location.
///
/// Deleted on drop unless [`commit`](Self::commit) renamed it into place.
struct PendingObject {
    temp: PathBuf,
    file: File,
    committed: bool,
}

impl PendingObject {
    fn create(target: &Path) -> io::Result<Self> {
        let name = target
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "object has no name"))?;
        let mut temp_name = std::ffi::OsString::from(".");
        temp_name.push(name);
        temp_name.push(".partial");
        let temp = target.with_file_name(temp_name);
        let file = File::create(&temp)?;
        Ok(Self {
            temp,
            file,
            committed: false,
        })
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }

    fn commit(mut self, target: &Path) -> io::Result<()> {
        self.file.sync_all()?;
        fs::rename(&self.temp, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PendingObject {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp);
        }
    }
}
