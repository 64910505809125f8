//! Filesystem-backed blob store.
//!
//! Objects live at `<root>/<bucket>/<key>`. Keys may contain `/` separators,
//! which become nested directories.

use super::{BlobError, BlobResult, BlobStore};
use log::{debug, error};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

const STAGING_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the on-disk path for an object without touching the disk.
    pub fn object_path(&self, bucket: &str, key: &str) -> BlobResult<PathBuf> {
        validate_bucket(bucket)?;
        validate_key(bucket, key)?;

        let mut path = self.root.join(bucket);
        for segment in key.split('/') {
            path.push(segment);
        }
        Ok(path)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bucket: &str, key: &str, content: &[u8]) -> BlobResult<()> {
        let started_at = Instant::now();
        let path = self.object_path(bucket, key)?;

        let result = write_object(&path, content);
        match &result {
            Ok(()) => debug!(
                "event=blob_put module=blob status=ok bucket={} bytes={} duration_ms={}",
                bucket,
                content.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=blob_put module=blob status=error bucket={} duration_ms={} error={}",
                bucket,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

/// Writes `content` to a sibling temp file and renames it over `path`, so a
/// reader sees either the previous object or the complete new one.
fn write_object(path: &Path, content: &[u8]) -> BlobResult<()> {
    let io_error = |source| BlobError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let staging = staging_path(path);
    let written = write_synced(&staging, content).and_then(|()| fs::rename(&staging, path));
    if let Err(source) = written {
        let _ = fs::remove_file(&staging);
        return Err(io_error(source));
    }
    Ok(())
}

fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}{STAGING_SUFFIX}", Uuid::new_v4().simple()))
}

fn validate_bucket(bucket: &str) -> BlobResult<()> {
    if bucket.is_empty() {
        return Err(invalid(bucket, "", "bucket cannot be empty"));
    }
    if bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
        return Err(invalid(bucket, "", "bucket must be a single path segment"));
    }
    Ok(())
}

fn validate_key(bucket: &str, key: &str) -> BlobResult<()> {
    if key.is_empty() {
        return Err(invalid(bucket, key, "key cannot be empty"));
    }
    if key.contains('\\') {
        return Err(invalid(bucket, key, "key cannot contain `\\`"));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid(
            bucket,
            key,
            "key segments cannot be empty, `.` or `..`",
        ));
    }
    Ok(())
}

fn invalid(bucket: &str, key: &str, reason: &str) -> BlobError {
    BlobError::InvalidLocation {
        location: format!("{bucket}/{key}"),
        reason: reason.to_string(),
    }
}
