//! Object storage for specification artifacts.
//!
//! # Responsibility
//! - Define the put-only contract the upload path depends on.
//! - Surface backend failures wrapped, without retrying.
//!
//! # Invariants
//! - One `put` call is one write attempt.
//! - Objects are addressed by `(bucket, key)` and carry no other metadata.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod fs;

pub use fs::FsBlobStore;

pub type BlobResult<T> = Result<T, BlobError>;

/// Address of one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobLocation {
    pub bucket: String,
    pub key: String,
}

impl BlobLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl Display for BlobLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug)]
pub enum BlobError {
    /// Bucket or key cannot be mapped onto the backend.
    InvalidLocation { location: String, reason: String },
    /// The backend rejected or failed the write.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for BlobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLocation { location, reason } => {
                write!(f, "invalid blob location `{location}`: {reason}")
            }
            Self::Io { path, source } => {
                write!(f, "blob write to `{}` failed: {source}", path.display())
            }
        }
    }
}

impl Error for BlobError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLocation { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Put-only object storage.
pub trait BlobStore {
    /// Stores `content` at `(bucket, key)`, replacing any existing object.
    fn put(&self, bucket: &str, key: &str, content: &[u8]) -> BlobResult<()>;
}

impl<B: BlobStore> BlobStore for &B {
    fn put(&self, bucket: &str, key: &str, content: &[u8]) -> BlobResult<()> {
        (**self).put(bucket, key, content)
    }
}
